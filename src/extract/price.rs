use regex::Regex;

/// All stored prices are BHD; USD amounts convert at the pegged rate.
const USD_TO_BHD: f64 = 0.376;

/// Decimal amount next to a currency marker.
const PRICE_PATTERN: &str = r"(?i)(BHD|BD|USD|\$)\s*([0-9]+(?:\.[0-9]+)?)";

pub struct PriceInfo {
    pub amount: f64,
    pub currency: &'static str,
    pub sold_out: bool,
}

/// Best-effort price from free text. Unparseable input is a zero price,
/// never an error; "sold out" anywhere flags the listing and zeroes the
/// price.
pub fn parse_price(text: &str) -> PriceInfo {
    if is_sold_out(text) {
        return PriceInfo {
            amount: 0.0,
            currency: "BHD",
            sold_out: true,
        };
    }

    let re = Regex::new(PRICE_PATTERN).unwrap();
    let amount = re
        .captures(text)
        .and_then(|caps| {
            let marker = caps.get(1).map(|m| m.as_str().to_ascii_uppercase())?;
            let value: f64 = caps.get(2)?.as_str().parse().ok()?;
            let bhd = if marker == "USD" || marker == "$" {
                round2(value * USD_TO_BHD)
            } else {
                value
            };
            Some(bhd)
        })
        .unwrap_or(0.0)
        .max(0.0);

    PriceInfo {
        amount,
        currency: "BHD",
        sold_out: false,
    }
}

pub fn is_sold_out(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("sold out") || lower.contains("soldout")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sold_out_any_case_zeroes_price() {
        for text in ["SOLD OUT", "Sold Out", "soldout", "Tickets SoldOut!"] {
            let p = parse_price(text);
            assert!(p.sold_out);
            assert_eq!(p.amount, 0.0);
        }
    }

    #[test]
    fn usd_converts_at_fixed_rate() {
        let p = parse_price("From $12.50 per person");
        assert!(!p.sold_out);
        assert_eq!(p.amount, 4.70);
        assert_eq!(p.currency, "BHD");

        let p = parse_price("USD 100");
        assert_eq!(p.amount, 37.60);
    }

    #[test]
    fn bhd_passes_through() {
        assert_eq!(parse_price("BHD 15.5").amount, 15.5);
        assert_eq!(parse_price("from BD 3 only").amount, 3.0);
    }

    #[test]
    fn unparseable_is_zero_not_error() {
        assert_eq!(parse_price("").amount, 0.0);
        assert_eq!(parse_price("free entry").amount, 0.0);
        assert_eq!(parse_price("call for price").amount, 0.0);
    }
}
