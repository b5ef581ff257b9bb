//! Token deployment from the bundled template
//!
//! Compiles the fixed ERC-20 template with an external `solc` binary
//! (`--combined-json abi,bin`), appends the ABI-encoded constructor
//! arguments, and deploys the creation code through the rollup signer.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolValue;
use eyre::{bail, ensure, eyre, Result, WrapErr};
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tracing::info;

use opstack_rs::BridgeOps;

use crate::config::Config;
use crate::render;

/// Output of one compiled contract.
#[derive(Debug, Clone)]
pub struct CompiledContract {
    /// Contract ABI as JSON
    pub abi: Value,
    /// Runtime-less creation bytecode, without constructor arguments
    pub bytecode: Vec<u8>,
}

/// Compile a Solidity source with the external compiler and pick one
/// contract out of the combined JSON output.
pub fn compile_contract(solc: &str, source: &Path, contract_name: &str) -> Result<CompiledContract> {
    info!(source = %source.display(), contract = contract_name, "Compiling token template");

    let output = Command::new(solc)
        .arg("--combined-json")
        .arg("abi,bin")
        .arg(source)
        .output()
        .wrap_err_with(|| format!("failed to run '{solc}'; is the Solidity compiler installed?"))?;

    ensure!(
        output.status.success(),
        "solc failed:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).wrap_err("solc output is not UTF-8")?;
    parse_combined_json(&stdout, contract_name)
}

/// Parse solc's `--combined-json abi,bin` output.
///
/// Contract keys look like `path/to/Token.sol:Token`; the contract is
/// matched by name suffix so the template can live at any path. The ABI
/// may be emitted as a JSON array or (older solc) as an escaped string.
pub fn parse_combined_json(json: &str, contract_name: &str) -> Result<CompiledContract> {
    let parsed: Value = serde_json::from_str(json).wrap_err("solc emitted invalid JSON")?;
    let contracts = parsed
        .get("contracts")
        .and_then(Value::as_object)
        .ok_or_else(|| eyre!("no contracts in solc output"))?;

    let suffix = format!(":{contract_name}");
    let entry = contracts
        .iter()
        .find(|(key, _)| key.ends_with(&suffix))
        .map(|(_, value)| value)
        .ok_or_else(|| eyre!("contract '{contract_name}' not found in solc output"))?;

    let bin = entry
        .get("bin")
        .and_then(Value::as_str)
        .ok_or_else(|| eyre!("solc output carries no bytecode"))?;
    ensure!(
        !bin.is_empty(),
        "contract '{contract_name}' compiled to empty bytecode"
    );
    let bytecode = hex::decode(bin).wrap_err("solc bytecode is not valid hex")?;

    let abi = match entry.get("abi") {
        Some(Value::String(inner)) => {
            serde_json::from_str(inner).wrap_err("solc ABI string is not valid JSON")?
        }
        Some(other) => other.clone(),
        None => bail!("solc output carries no ABI"),
    };

    Ok(CompiledContract { abi, bytecode })
}

/// Creation code for the token template: bytecode followed by the
/// ABI-encoded `(string name, string symbol, uint256 initialSupply)`.
pub fn token_creation_code(
    bytecode: &[u8],
    name: &str,
    symbol: &str,
    initial_supply: U256,
) -> Bytes {
    let args = (name.to_string(), symbol.to_string(), initial_supply).abi_encode_params();
    let mut code = Vec::with_capacity(bytecode.len() + args.len());
    code.extend_from_slice(bytecode);
    code.extend_from_slice(&args);
    code.into()
}

/// Compile the template and deploy it to the rollup.
pub async fn deploy_flow<B: BridgeOps>(
    bridge: &B,
    config: &Config,
    name: &str,
    symbol: &str,
    initial_supply: U256,
) -> Result<Address> {
    render::step("Compiling token template");
    let compiled = compile_contract(
        &config.solc_path,
        &config.token_template,
        &config.token_contract_name,
    )?;
    render::ok(&format!(
        "Compiled ({} bytes of bytecode)",
        compiled.bytecode.len()
    ));

    let creation_code = token_creation_code(&compiled.bytecode, name, symbol, initial_supply);

    render::step("Deploying to L2");
    let confirmation = bridge.deploy_contract(creation_code).await?;
    let address = confirmation
        .contract_address
        .ok_or_else(|| eyre!("deployment receipt carries no contract address"))?;
    render::ok(&format!(
        "Deployed at {address} (tx {})",
        confirmation.tx_hash
    ));

    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMBINED_JSON: &str = r#"{
        "contracts": {
            "contracts/Token.sol:Token": {
                "abi": [{"type": "constructor", "inputs": []}],
                "bin": "60806040526000"
            }
        },
        "version": "0.8.24+commit.e11b9ed9"
    }"#;

    #[test]
    fn test_parse_combined_json() {
        let compiled = parse_combined_json(COMBINED_JSON, "Token").expect("parses");
        assert_eq!(compiled.bytecode, hex::decode("60806040526000").unwrap());
        assert!(compiled.abi.is_array());
    }

    #[test]
    fn test_parse_combined_json_abi_as_string() {
        let json = r#"{
            "contracts": {
                "Token.sol:Token": {
                    "abi": "[{\"type\":\"constructor\"}]",
                    "bin": "6080"
                }
            }
        }"#;
        let compiled = parse_combined_json(json, "Token").expect("parses");
        assert!(compiled.abi.is_array());
    }

    #[test]
    fn test_parse_combined_json_missing_contract() {
        assert!(parse_combined_json(COMBINED_JSON, "Other").is_err());
    }

    #[test]
    fn test_parse_combined_json_empty_bytecode() {
        let json = r#"{"contracts": {"Token.sol:Token": {"abi": [], "bin": ""}}}"#;
        assert!(parse_combined_json(json, "Token").is_err());
    }

    #[test]
    fn test_creation_code_layout() {
        let bytecode = hex::decode("60806040").unwrap();
        let supply = U256::from(1_000_000u64);
        let code = token_creation_code(&bytecode, "My Token", "MTK", supply);

        assert!(code.starts_with(&bytecode));
        // Head: two string offsets then the supply word
        let args = &code[bytecode.len()..];
        assert!(args.len() >= 96);
        assert_eq!(&args[64..96], supply.to_be_bytes::<32>().as_slice());
    }
}
