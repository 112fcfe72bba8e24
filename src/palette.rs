/// Colors used when the chart config supplies none
pub const DEFAULT_PALETTE: [&str; 9] = [
    "#B399FD", "#FC8497", "#FBBC30", "#279EFF", "#E83562", "#41F8FF", "#F3864F", "#C82184",
    "#31FCB4",
];

/// Color for the series at `index`.
///
/// A per-column override always wins and is not deduplicated against palette
/// colors already in use. Otherwise the palette cycles by index, so colors
/// stay put as long as series order does.
pub fn assign_color(index: usize, palette: &[String], color_override: Option<&str>) -> String {
    if let Some(color) = color_override {
        return color.to_string();
    }
    if palette.is_empty() {
        return DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()].to_string();
    }
    palette[index % palette.len()].clone()
}
