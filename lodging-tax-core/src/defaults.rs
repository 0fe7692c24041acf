//! Built-in accommodation tax schedules.
//!
//! These seed a fresh installation and are what a bracket reset restores.
//! Bounds are whole yen per person per night and inclusive on both ends.

use crate::models::TaxBracket;

/// (from, to, tax) with `None` meaning no upper bound.
type Tier = (i64, Option<i64>, i64);

const DEFAULT_SCHEDULES: &[(&str, &[Tier])] = &[
    (
        "札幌市",
        &[(0, Some(19999), 300), (20000, Some(49999), 400), (50000, None, 1000)],
    ),
    (
        "小樽市",
        &[(0, Some(19999), 300), (20000, Some(49999), 400), (50000, None, 700)],
    ),
    (
        "ニセコ町",
        &[
            (0, Some(5000), 200),
            (5001, Some(19999), 300),
            (20000, Some(49999), 700),
            (50000, Some(99999), 1500),
            (100000, None, 2500),
        ],
    ),
    (
        "留寿都村",
        &[(0, Some(19999), 200), (20000, Some(49999), 400), (50000, None, 1000)],
    ),
    (
        "赤井川村",
        &[
            (0, Some(7999), 100),
            (8000, Some(19999), 300),
            (20000, Some(49999), 700),
            (50000, None, 1000),
        ],
    ),
    (
        "洞爺湖町",
        &[(0, Some(19999), 300), (20000, Some(49999), 700), (50000, None, 1500)],
    ),
    (
        "函館市",
        &[
            (0, Some(19999), 200),
            (20000, Some(49999), 400),
            (50000, Some(99999), 1000),
            (100000, None, 2500),
        ],
    ),
];

/// The default bracket set, municipality by municipality.
///
/// `sort_order` restarts at 1 for each municipality.
pub fn default_tax_brackets() -> Vec<TaxBracket> {
    DEFAULT_SCHEDULES
        .iter()
        .flat_map(|(municipality, tiers)| {
            tiers
                .iter()
                .zip(1..)
                .map(move |(&(from_amount, to_amount, tax_amount), sort_order)| TaxBracket {
                    municipality: (*municipality).to_string(),
                    from_amount,
                    to_amount,
                    tax_amount,
                    sort_order,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::TaxTable;

    #[test]
    fn defaults_cover_seven_municipalities_in_order() {
        let table = TaxTable::new(default_tax_brackets());

        assert_eq!(
            table.municipalities(),
            ["札幌市", "小樽市", "ニセコ町", "留寿都村", "赤井川村", "洞爺湖町", "函館市"]
        );
    }

    #[test]
    fn defaults_pass_validation() {
        assert_eq!(TaxTable::validate(&default_tax_brackets()), Ok(()));
    }

    #[test]
    fn every_municipality_ends_unbounded() {
        let table = TaxTable::new(default_tax_brackets());

        for municipality in table.municipalities() {
            let last = table.brackets_for(municipality).last().unwrap();
            assert_eq!(last.to_amount, None, "{municipality}");
        }
    }

    #[test]
    fn sapporo_schedule() {
        let table = TaxTable::new(default_tax_brackets());

        assert_eq!(table.resolve("札幌市", dec!(10000)), dec!(300));
        assert_eq!(table.resolve("札幌市", dec!(19999.99)), dec!(300));
        assert_eq!(table.resolve("札幌市", dec!(20000)), dec!(400));
        assert_eq!(table.resolve("札幌市", dec!(50000)), dec!(1000));
    }

    #[test]
    fn niseko_schedule_has_five_tiers() {
        let table = TaxTable::new(default_tax_brackets());

        assert_eq!(table.brackets_for("ニセコ町").count(), 5);
        assert_eq!(table.resolve("ニセコ町", dec!(5000)), dec!(200));
        assert_eq!(table.resolve("ニセコ町", dec!(5001)), dec!(300));
        assert_eq!(table.resolve("ニセコ町", dec!(120000)), dec!(2500));
    }

    #[test]
    fn fractional_rate_is_truncated_and_negative_rate_is_unmatched() {
        let table = TaxTable::new(default_tax_brackets());

        // 5000.5 truncates to 5000, still in the first tier.
        assert_eq!(table.resolve("ニセコ町", dec!(5000.5)), dec!(200));
        assert_eq!(table.resolve("函館市", dec!(-1)), dec!(0));
    }
}
