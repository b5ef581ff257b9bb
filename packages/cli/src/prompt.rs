//! Interactive input
//!
//! Line-based prompts over stdin. Invalid input re-asks instead of
//! aborting; a closed stdin is an error the caller treats as "leave".

use alloy::primitives::{utils::parse_ether, B256, U256};
use eyre::{bail, eyre, Result};
use std::io::{self, BufRead, Write};

/// Print a prompt and read one trimmed line.
pub fn read_line(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    if read == 0 {
        bail!("input closed");
    }
    Ok(line.trim().to_string())
}

/// Parse a decimal ETH amount into wei. Zero and negative are rejected.
pub fn parse_eth_amount(input: &str) -> Result<U256> {
    let input = input.trim();
    if input.is_empty() {
        bail!("amount is empty");
    }
    let amount = parse_ether(input).map_err(|e| eyre!("not a valid ETH amount: {e}"))?;
    if amount.is_zero() {
        bail!("amount must be greater than zero");
    }
    Ok(amount)
}

/// Parse a token supply given in whole tokens (18 decimals). Underscore
/// separators are allowed.
pub fn parse_token_supply(input: &str) -> Result<U256> {
    parse_eth_amount(&input.replace('_', ""))
}

/// Parse a 32-byte transaction hash: `0x` followed by 64 hex digits.
pub fn parse_tx_hash(input: &str) -> Result<B256> {
    let input = input.trim();
    let hex_part = input
        .strip_prefix("0x")
        .ok_or_else(|| eyre!("transaction hash must start with 0x"))?;
    if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("transaction hash must be 0x followed by 64 hex digits");
    }
    Ok(input.parse()?)
}

/// Ask for an ETH amount, re-asking until it parses as a positive number.
/// An empty line accepts the suggested initial value.
pub fn prompt_amount(message: &str, initial: &str) -> Result<U256> {
    loop {
        let line = read_line(&format!("{message} [{initial}]: "))?;
        let candidate = if line.is_empty() { initial } else { &line };
        match parse_eth_amount(candidate) {
            Ok(amount) => return Ok(amount),
            Err(error) => println!("  {error}; enter a number greater than zero"),
        }
    }
}

/// Ask for a transaction hash, re-asking until it is well-formed.
pub fn prompt_tx_hash(message: &str) -> Result<B256> {
    loop {
        let line = read_line(&format!("{message}: "))?;
        match parse_tx_hash(&line) {
            Ok(hash) => return Ok(hash),
            Err(error) => println!("  {error}"),
        }
    }
}

/// Ask a yes/no question. An empty line takes the default.
pub fn confirm(message: &str, default_yes: bool) -> Result<bool> {
    let suffix = if default_yes { "[Y/n]" } else { "[y/N]" };
    loop {
        let line = read_line(&format!("{message} {suffix}: "))?;
        match line.to_ascii_lowercase().as_str() {
            "" => return Ok(default_yes),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("  please answer y or n"),
        }
    }
}

/// Ask for a free-form string. An empty line accepts the initial value.
pub fn prompt_text(message: &str, initial: &str) -> Result<String> {
    let line = read_line(&format!("{message} [{initial}]: "))?;
    Ok(if line.is_empty() {
        initial.to_string()
    } else {
        line
    })
}

/// Numbered menu; returns the selected index. An empty line selects the
/// first entry.
pub fn prompt_menu(title: &str, items: &[&str]) -> Result<usize> {
    println!("{title}");
    for (i, item) in items.iter().enumerate() {
        println!("  {}) {}", i + 1, item);
    }
    loop {
        let line = read_line("Select [1]: ")?;
        if line.is_empty() {
            return Ok(0);
        }
        match line.parse::<usize>() {
            Ok(choice) if (1..=items.len()).contains(&choice) => return Ok(choice - 1),
            _ => println!("  enter a number between 1 and {}", items.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_eth_amount_valid() {
        assert_eq!(
            parse_eth_amount("0.001").unwrap(),
            U256::from(1_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_eth_amount("1").unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_eth_amount(" 0.00005 ").unwrap(),
            U256::from(50_000_000_000_000u64)
        );
    }

    #[test]
    fn test_parse_eth_amount_rejects_zero_and_garbage() {
        assert!(parse_eth_amount("0").is_err());
        assert!(parse_eth_amount("0.0").is_err());
        assert!(parse_eth_amount("-1").is_err());
        assert!(parse_eth_amount("abc").is_err());
        assert!(parse_eth_amount("").is_err());
    }

    #[test]
    fn test_parse_token_supply_allows_separators() {
        assert_eq!(
            parse_token_supply("1_000_000").unwrap(),
            parse_eth_amount("1000000").unwrap()
        );
    }

    #[test]
    fn test_parse_tx_hash_valid() {
        let hash = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        assert_eq!(parse_tx_hash(hash).unwrap(), hash.parse::<B256>().unwrap());
    }

    #[test]
    fn test_parse_tx_hash_rejects_malformed() {
        // No prefix
        assert!(parse_tx_hash(
            "1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef"
        )
        .is_err());
        // Too short
        assert!(parse_tx_hash("0x1234").is_err());
        // Too long
        assert!(parse_tx_hash(
            "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef00"
        )
        .is_err());
        // Non-hex character
        assert!(parse_tx_hash(
            "0xz234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef"
        )
        .is_err());
    }
}
