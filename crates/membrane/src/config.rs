//! Sandbox configuration.

use serde::{Deserialize, Serialize};

use crate::abi::AbiTable;
use crate::error::Result;
use crate::mem::AddressMode;

/// Configuration for a sandbox instance.
///
/// ```rust,ignore
/// let config = SandboxConfig::wasm32().address_mode(AddressMode::Fixed);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Heap address strategy (whether the sandbox heap may move).
    pub address_mode: AddressMode,
    /// ABI representation table for values crossing the boundary.
    pub abi: AbiTable,
}

impl SandboxConfig {
    /// Preset: sandbox sharing the host ABI, relocatable heap.
    pub fn host() -> Self {
        Self {
            address_mode: AddressMode::Relocatable,
            abi: AbiTable::host(),
        }
    }

    /// Preset: 32-bit WASM guest ABI, relocatable heap.
    pub fn wasm32() -> Self {
        Self {
            address_mode: AddressMode::Relocatable,
            abi: AbiTable::wasm32(),
        }
    }

    /// Set the heap address strategy.
    pub fn address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode = mode;
        self
    }

    /// Set the ABI representation table.
    pub fn abi(mut self, abi: AbiTable) -> Self {
        self.abi = abi;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.abi.validate()
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{AbiType, Scalar};

    #[test]
    fn test_presets() {
        let host = SandboxConfig::host();
        assert_eq!(host.address_mode, AddressMode::Relocatable);
        assert_eq!(host.abi.pointer_repr(), AbiType::U64);
        assert_eq!(host, SandboxConfig::default());

        let wasm = SandboxConfig::wasm32();
        assert_eq!(wasm.abi.pointer_repr(), AbiType::U32);
    }

    #[test]
    fn test_builder_chain() {
        let table = AbiTable::host()
            .with_repr(Scalar::U64, AbiType::U32)
            .unwrap();
        let config = SandboxConfig::host()
            .address_mode(AddressMode::Fixed)
            .abi(table.clone());
        assert_eq!(config.address_mode, AddressMode::Fixed);
        assert_eq!(config.abi, table);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = SandboxConfig::wasm32().address_mode(AddressMode::Fixed);
        let json = serde_json::to_string(&config).unwrap();
        let back: SandboxConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
