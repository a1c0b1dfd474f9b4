// Compact value text for axis labels and the status bar
pub fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1e6 || (magnitude > 0.0 && magnitude < 1e-2) {
        format!("{:.2e}", value)
    } else if magnitude >= 1000.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.2}", value)
    }
}

pub fn format_count(count: u64) -> String {
    const K: u64 = 1000;
    const M: u64 = 1000 * K;
    if count >= M {
        format!("{:.2}M", count as f64 / M as f64)
    } else if count >= 10 * K {
        format!("{:.1}K", count as f64 / K as f64)
    } else {
        format!("{}", count)
    }
}
