//! Euro rendering for validation messages and API payloads.
//!
//! Pure integer arithmetic — the engine never converts cents to a float,
//! not even for display.

use crate::types::Cents;

/// Render cents as a French-style euro string: `1234` → `"12,34 €"`.
pub fn format_eur(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{},{:02} €", cents / 100, cents % 100)
}

/// Render a list of amounts, comma-separated: `"5,00 €, 10,00 €"`.
pub fn format_eur_list(amounts: &[Cents]) -> String {
    amounts
        .iter()
        .map(|&a| format_eur(a))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_and_fractional_euros() {
        assert_eq!(format_eur(0), "0,00 €");
        assert_eq!(format_eur(5), "0,05 €");
        assert_eq!(format_eur(500), "5,00 €");
        assert_eq!(format_eur(1234), "12,34 €");
        assert_eq!(format_eur(-150), "-1,50 €");
    }

    #[test]
    fn formats_lists() {
        assert_eq!(
            format_eur_list(&[500, 1000, 2000]),
            "5,00 €, 10,00 €, 20,00 €"
        );
    }
}
