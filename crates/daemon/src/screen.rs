// Text rendering of poller events (the watcher's "screen")

use arcade_queue_core::application::{format_start, format_wait, QueueEvent, QueueView, TimeSource};
use arcade_queue_core::domain::Category;
use std::fmt::Write;

/// Render one poller event as the block printed to stdout
pub fn render_event(event: &QueueEvent) -> String {
    match event {
        QueueEvent::Updated {
            category,
            view,
            time_source,
            removed,
        } => {
            let mut out = render_view(*category, view, *time_source);
            if *removed > 0 {
                let _ = writeln!(out, "({removed} finished turn(s) removed)");
            }
            out
        }
        QueueEvent::TurnArrived { category, entry } => format!(
            "*** It's your turn on {category}, {}! ***\n",
            entry.entry.display_name
        ),
        QueueEvent::Stale {
            category,
            last_view,
            error,
        } => {
            let mut out = format!("[stale] {category}: {error}\n");
            if let Some(view) = last_view {
                out.push_str(&render_view(*category, view, TimeSource::LocalFallback));
            }
            out
        }
    }
}

pub fn render_view(category: Category, view: &QueueView, time_source: TimeSource) -> String {
    let mut out = String::new();
    let clock = match time_source {
        TimeSource::Authority => "",
        TimeSource::LocalFallback => " [local clock]",
    };
    let _ = writeln!(out, "== {category} ({} in line){clock} ==", view.len());

    if view.is_empty() {
        let _ = writeln!(out, "Nobody in line");
    }
    for (i, projected) in view.entries.iter().enumerate() {
        let marker = if view.position == Some(i + 1) { ">" } else { " " };
        let _ = writeln!(
            out,
            "{marker}{:>3}. {:<20} {}  ({})",
            i + 1,
            projected.entry.display_name,
            format_start(Some(projected.projected_start)),
            projected.entry.wait_allotment
        );
    }

    if view.position.is_some() {
        let _ = writeln!(
            out,
            "People ahead: {}  Estimated wait: {}",
            view.people_ahead,
            format_wait(view.total_wait_minutes)
        );
    }
    out
}
