use nearby_core::{StoreEvent, StoreListener};

/// Listener that prints each store change as a line of output.
pub fn printer() -> StoreListener {
    Box::new(|event| {
        if let Some(line) = describe(event) {
            println!("{line}");
        }
    })
}

fn describe(event: &StoreEvent) -> Option<String> {
    match event {
        StoreEvent::CandidateAdded { index, place } => Some(format!("  [{}] {place}", index + 1)),
        StoreEvent::WeatherChanged(Some(weather)) => Some(format!("{weather}")),
        StoreEvent::PoiAdded(poi) => Some(format!("  * {}", poi.name)),
        StoreEvent::PoiUpdated(poi) if poi.is_resolved() => Some(format!("{poi}")),
        StoreEvent::PoiUpdated(_)
        | StoreEvent::CandidateRemoved { .. }
        | StoreEvent::PoiRemoved(_)
        | StoreEvent::WeatherChanged(None) => None,
    }
}
