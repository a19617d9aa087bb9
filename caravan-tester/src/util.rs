use anyhow::{Context, Result};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse a comma list of seeds; `0x` prefixes are read as hex.
pub fn parse_seeds(s: &str) -> Result<Vec<u64>> {
    split_csv(s)
        .iter()
        .map(|token| {
            let parsed = token.strip_prefix("0x").map_or_else(
                || token.parse::<u64>(),
                |hex| u64::from_str_radix(hex, 16),
            );
            parsed.with_context(|| format!("invalid seed '{token}'"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn parse_seeds_accepts_decimal_and_hex() {
        assert_eq!(parse_seeds("1337, 0xff").unwrap(), vec![1337, 255]);
    }

    #[test]
    fn parse_seeds_names_the_bad_token() {
        let err = parse_seeds("12,abc").unwrap_err();
        assert!(err.to_string().contains("'abc'"));
    }
}
