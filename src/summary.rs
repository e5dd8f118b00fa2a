//! Cross-provider summary.
//!
//! Only confirmed results with data contribute identity fields. Nothing is
//! cross-correlated: `name` and `avatar` are simply the first values found
//! while walking sources in priority order, and the list fields are
//! first-seen unions in declaration order.

use crate::models::{Found, SourceResult, SourcedAvatar, SourcedText, SummaryReport};
use crate::normalize::is_confirmed;

/// Build the [`SummaryReport`] for one request.
///
/// `priority` lists provider names whose `name`/`avatar` should win; any
/// provider not listed follows in declaration order.
pub fn summarize(results: &[SourceResult], priority: &[String]) -> SummaryReport {
    let mut report = SummaryReport {
        total_count: results.len(),
        ..Default::default()
    };

    for result in results {
        match result.found {
            Found::Confirmed => report.confirmed_count += 1,
            Found::Heuristic => report.likely_count += 1,
            Found::Absent => report.not_found_count += 1,
            Found::Indeterminate => {}
        }
    }

    for result in by_priority(results, priority) {
        let Some(data) = result.data.as_ref() else {
            continue;
        };
        if let Some(name) = &data.name {
            push_unique(&mut report.names, name);
        }
        if let Some(url) = &data.avatar {
            report.avatars.push(SourcedAvatar {
                source: result.source.clone(),
                url: url.clone(),
            });
        }
    }
    report.name = report.names.first().cloned();
    report.avatar = report.avatars.first().map(|a| a.url.clone());

    for result in results.iter().filter(|r| is_confirmed(r)) {
        let Some(data) = result.data.as_ref() else {
            continue;
        };
        if let Some(location) = &data.location {
            push_unique(&mut report.locations, location);
        }
        if let Some(website) = &data.website {
            push_unique(&mut report.websites, website);
        }
        if let Some(bio) = &data.bio {
            report.bios.push(SourcedText {
                source: result.source.clone(),
                text: bio.clone(),
            });
        }
    }

    report
}

/// Confirmed results, listed providers first (in list order), then the rest
/// in declaration order.
pub(crate) fn by_priority<'a>(
    results: &'a [SourceResult],
    priority: &[String],
) -> Vec<&'a SourceResult> {
    let confirmed: Vec<&SourceResult> = results.iter().filter(|r| is_confirmed(r)).collect();

    let mut ordered: Vec<&SourceResult> = priority
        .iter()
        .filter_map(|name| confirmed.iter().copied().find(|r| &r.source == name))
        .collect();
    ordered.extend(
        confirmed
            .iter()
            .copied()
            .filter(|r| !priority.contains(&r.source)),
    );
    ordered
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
