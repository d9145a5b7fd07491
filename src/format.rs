//! Currency strings for labels and tooltips drawn from a [`FlowGraph`](crate::graph::FlowGraph).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyStyle {
    /// `$1.2B`
    Compact,
    /// `$1.20 billion`
    Verbose,
}

const SCALES: [(f64, &str, &str); 4] = [
    (1e12, "T", "trillion"),
    (1e9, "B", "billion"),
    (1e6, "M", "million"),
    (1e3, "K", "thousand"),
];

pub fn format_currency(value: f64, style: CurrencyStyle) -> String {
    if !value.is_finite() {
        return "N/A".to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    let decimals = match style {
        CurrencyStyle::Compact => 1,
        CurrencyStyle::Verbose => 2,
    };

    // The unit is chosen on the rounded value so 999,999 reads $1.0M, not $1000.0K.
    for (threshold, suffix, word) in SCALES {
        let scaled = round_to(magnitude / threshold, decimals);
        if scaled >= 1.0 {
            return match style {
                CurrencyStyle::Compact => format!("{}${:.1}{}", sign, scaled, suffix),
                CurrencyStyle::Verbose => format!("{}${:.2} {}", sign, scaled, word),
            };
        }
    }

    match style {
        CurrencyStyle::Compact => format!("{}${:.0}", sign, magnitude),
        CurrencyStyle::Verbose => format!("{}${:.2}", sign, magnitude),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn format_compact(value: f64) -> String {
    format_currency(value, CurrencyStyle::Compact)
}

pub fn format_verbose(value: f64) -> String {
    format_currency(value, CurrencyStyle::Verbose)
}
