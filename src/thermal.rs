//! Thermal file parsing

/// Temperature in Celsius
pub(crate) type Temp = u16;

/// Parse the first temperature of the thermal file, usually the CPU one
pub(crate) fn parse(raw: &str) -> anyhow::Result<Temp> {
    let temp = raw
        .lines()
        .find_map(|l| l.trim_start().strip_prefix("temperatures:"))
        .map(|l| {
            l.trim_start()
                .chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
        })
        .ok_or_else(|| anyhow::anyhow!("No temperatures line"))?
        .parse()?;
    Ok(temp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_first_temperature() {
        assert_eq!(
            parse("temperatures:\t48 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n").unwrap(),
            48
        );
        assert_eq!(parse("temperatures: 61 -128 35\n").unwrap(), 61);
        assert_eq!(parse("foo: 1\ntemperatures:52\n").unwrap(), 52);
    }

    #[test]
    fn parse_invalid() {
        assert!(parse("").is_err());
        assert!(parse("temperatures:\n").is_err());
        assert!(parse("temperatures: -128 40\n").is_err());
        assert!(parse("temperature: 40\n").is_err());
    }
}
