//! ABI parsing and encoding utilities
//!
//! Provides the [`Abi`] struct for declarative access to contract ABI information
//! and the conversion of JSON initializer arguments into ABI-encoded calldata.

use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, FixedBytes, I256, U256};

use crate::error::{Error, Result};
use crate::types::InitArgs;

// =============================================================================
// Abi Struct
// =============================================================================

/// Wrapper around alloy's JsonAbi providing a declarative interface
/// for the ABI operations the orchestrator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Abi(JsonAbi);

impl Abi {
    /// Parse a JSON ABI string into an Abi struct
    pub fn parse(json: &str) -> Result<Self> {
        let abi: JsonAbi = serde_json::from_str(json)
            .map_err(|e| Error::Abi(format!("Failed to parse ABI: {}", e)))?;
        Ok(Self(abi))
    }

    /// Parse from a serde_json::Value
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let abi: JsonAbi = serde_json::from_value(value.clone())
            .map_err(|e| Error::Abi(format!("Failed to parse ABI: {}", e)))?;
        Ok(Self(abi))
    }

    // -------------------------------------------------------------------------
    // Constructor
    // -------------------------------------------------------------------------

    /// Number of constructor parameters (0 when there is no constructor)
    pub fn constructor_arity(&self) -> usize {
        self.0.constructor.as_ref().map_or(0, |c| c.inputs.len())
    }

    /// Check if the contract has a constructor with arguments
    pub fn has_constructor_with_args(&self) -> bool {
        self.constructor_arity() > 0
    }

    // -------------------------------------------------------------------------
    // Functions
    // -------------------------------------------------------------------------

    /// Get a specific function by name (returns first overload if multiple exist)
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.0.functions.get(name).and_then(|funcs| funcs.first())
    }

    /// Get all overloads of a function by name
    pub fn function_overloads(&self, name: &str) -> Option<&Vec<Function>> {
        self.0.functions.get(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.0.functions.contains_key(name)
    }

    /// Resolve the initializer overload matching `args` and encode the call.
    ///
    /// Fails with [`Error::InvalidInitArgs`] when no overload has the right
    /// arity or an argument does not convert to its declared type.
    pub fn encode_initializer(&self, name: &str, args: &InitArgs) -> Result<InitCall> {
        let overloads = self.function_overloads(name).ok_or_else(|| {
            Error::InvalidInitArgs(format!("No initializer function named '{}'", name))
        })?;

        let function = overloads
            .iter()
            .find(|f| f.inputs.len() == args.len())
            .ok_or_else(|| {
                let expected: Vec<String> = overloads.iter().map(|f| f.signature()).collect();
                Error::InvalidInitArgs(format!(
                    "Expected {} argument(s) for {}, got {}",
                    overloads
                        .iter()
                        .map(|f| f.inputs.len().to_string())
                        .collect::<Vec<_>>()
                        .join(" or "),
                    expected.join(" | "),
                    args.len()
                ))
            })?;

        let mut values = Vec::with_capacity(args.len());
        for (i, (input, value)) in function.inputs.iter().zip(args.values()).enumerate() {
            let ty = input.resolve().map_err(|e| {
                Error::Abi(format!("Cannot resolve type of '{}': {}", input.name, e))
            })?;
            let sol_value = json_to_sol_value(&ty, value).map_err(|e| {
                Error::InvalidInitArgs(format!(
                    "Argument {} ({} {}): {}",
                    i, input.ty, input.name, e
                ))
            })?;
            values.push(sol_value);
        }

        let calldata = function
            .abi_encode_input(&values)
            .map_err(|e| Error::InvalidInitArgs(format!("Failed to encode {}: {}", name, e)))?;

        Ok(InitCall {
            signature: function.signature(),
            calldata: Bytes::from(calldata),
        })
    }
}

/// An encoded initializer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitCall {
    /// Canonical signature, e.g. `initialize(string,string,string)`
    pub signature: String,
    /// Selector followed by the ABI-encoded arguments
    pub calldata: Bytes,
}

// =============================================================================
// JSON -> Solidity value conversion
// =============================================================================

/// Convert a JSON value into a Solidity value of the given type
pub fn json_to_sol_value(
    sol_type: &DynSolType,
    value: &serde_json::Value,
) -> std::result::Result<DynSolValue, String> {
    match sol_type {
        DynSolType::Address => {
            let addr_str = value.as_str().ok_or("Expected string for address")?;
            let addr: Address = addr_str
                .parse()
                .map_err(|e| format!("Invalid address '{}': {}", addr_str, e))?;
            Ok(DynSolValue::Address(addr))
        }
        DynSolType::Bool => {
            let b = value.as_bool().ok_or("Expected boolean")?;
            Ok(DynSolValue::Bool(b))
        }
        DynSolType::Uint(bits) => {
            let n = parse_uint(value)?;
            if *bits < 256 && n.bit_len() > *bits {
                return Err(format!("Value does not fit in uint{}", bits));
            }
            Ok(DynSolValue::Uint(n, *bits))
        }
        DynSolType::Int(bits) => {
            let n = parse_int(value)?;
            Ok(DynSolValue::Int(n, *bits))
        }
        DynSolType::Bytes => {
            let hex_str = value.as_str().ok_or("Expected hex string for bytes")?;
            let bytes: Bytes = hex_str.parse().map_err(|e| format!("Invalid hex: {}", e))?;
            Ok(DynSolValue::Bytes(bytes.to_vec()))
        }
        DynSolType::String => {
            let s = value.as_str().ok_or("Expected string")?;
            Ok(DynSolValue::String(s.to_string()))
        }
        DynSolType::FixedBytes(size) => {
            let hex_str = value.as_str().ok_or("Expected hex string")?;
            let bytes: Bytes = hex_str.parse().map_err(|e| format!("Invalid hex: {}", e))?;
            if bytes.len() != *size {
                return Err(format!("Expected {} bytes, got {}", size, bytes.len()));
            }
            Ok(DynSolValue::FixedBytes(
                FixedBytes::<32>::right_padding_from(&bytes),
                *size,
            ))
        }
        DynSolType::Array(inner) => {
            let arr = value.as_array().ok_or("Expected array")?;
            let values = arr
                .iter()
                .map(|v| json_to_sol_value(inner, v))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Array(values))
        }
        DynSolType::FixedArray(inner, len) => {
            let arr = value.as_array().ok_or("Expected array")?;
            if arr.len() != *len {
                return Err(format!("Expected {} elements, got {}", len, arr.len()));
            }
            let values = arr
                .iter()
                .map(|v| json_to_sol_value(inner, v))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(DynSolValue::FixedArray(values))
        }
        DynSolType::Tuple(types) => {
            let arr = value.as_array().ok_or("Expected array for tuple")?;
            if arr.len() != types.len() {
                return Err(format!(
                    "Expected {} tuple fields, got {}",
                    types.len(),
                    arr.len()
                ));
            }
            let values = types
                .iter()
                .zip(arr)
                .map(|(ty, v)| json_to_sol_value(ty, v))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(DynSolValue::Tuple(values))
        }
        other => Err(format!("Unsupported type: {}", other)),
    }
}

/// Parse an unsigned integer from a JSON number or decimal/hex string
pub fn parse_uint(value: &serde_json::Value) -> std::result::Result<U256, String> {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(U256::from(u))
            } else if n.as_i64().is_some() {
                Err("Negative number not allowed for uint".to_string())
            } else {
                Err("Number too large, pass it as a string".to_string())
            }
        }
        serde_json::Value::String(s) => s
            .parse::<U256>()
            .map_err(|e| format!("Invalid uint: {}", e)),
        _ => Err("Expected number or string for uint".to_string()),
    }
}

/// Parse a signed integer from a JSON number or string
pub fn parse_int(value: &serde_json::Value) -> std::result::Result<I256, String> {
    match value {
        serde_json::Value::Number(n) => {
            let i = n.as_i64().ok_or("Number out of range")?;
            I256::try_from(i).map_err(|e| format!("Invalid int: {}", e))
        }
        serde_json::Value::String(s) => s.parse::<I256>().map_err(|e| format!("Invalid int: {}", e)),
        _ => Err("Expected number or string for int".to_string()),
    }
}
