//! Human-readable byte sizes using binary units.

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

const UNITS: [(u64, &str); 3] = [(GIB, "GiB"), (MIB, "MiB"), (KIB, "KiB")];

/// Renders `bytes` in the largest unit whose magnitude is at least one,
/// rounded to two decimals (`512 B`, `6.0 KiB`, `1.33 MiB`).
#[must_use]
pub fn format_size(bytes: u64) -> String {
    UNITS
        .iter()
        .find(|(scale, _)| bytes >= *scale)
        .map_or_else(
            || format!("{bytes} B"),
            |(scale, label)| format!("{} {label}", scaled(bytes, *scale)),
        )
}

/// Divides `bytes` by `scale`, rounding half up to two decimals and dropping
/// a trailing zero in the hundredths place.
#[expect(
    clippy::integer_division,
    clippy::integer_division_remainder_used,
    reason = "fixed-point rounding keeps the result exact without floats"
)]
fn scaled(bytes: u64, scale: u64) -> String {
    let divisor = u128::from(scale);
    let hundredths = (u128::from(bytes) * 100 + divisor / 2) / divisor;
    let whole = hundredths / 100;
    let fraction = hundredths % 100;
    if fraction % 10 == 0 {
        format!("{whole}.{}", fraction / 10)
    } else {
        format!("{whole}.{fraction:02}")
    }
}
