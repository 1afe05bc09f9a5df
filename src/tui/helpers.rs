// Small formatting helpers shared by the render functions

/// Fraction of the folder prefetched so far, clamped to 0.0..=1.0
pub fn calculate_progress(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (processed as f64 / total as f64).min(1.0)
}

/// Label for the folder an image sits in; the empty folder is the scanned root
pub fn folder_label(folder: &str) -> &str {
    if folder.is_empty() {
        "(unsorted)"
    } else {
        folder
    }
}

/// Shortens `text` to at most `max` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}
