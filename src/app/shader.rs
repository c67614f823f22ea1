use super::error::EngineError;

use anyhow::{anyhow, Result};
use log::*;
use std::path::Path;
use vulkanalia::prelude::v1_2::*;

/// Reads precompiled SPIR-V from disk.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bytecode = std::fs::read(path).map_err(|source| EngineError::ShaderLoad { path: path.to_path_buf(), source })?;
    debug!("Loaded shader `{}` ({} bytes).", path.display(), bytecode.len());
    Ok(bytecode)
}

/// Repacks SPIR-V bytes into `u32` words, which also guarantees alignment.
fn to_words(bytecode: &[u8]) -> Result<Vec<u32>> {
    if bytecode.is_empty() || bytecode.len() % 4 != 0 {
        return Err(anyhow!("Shader bytecode length ({}) is not a multiple of 4.", bytecode.len()));
    }

    Ok(bytecode
        .chunks_exact(4)
        .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
        .collect())
}

pub unsafe fn create_shader_module(device: &Device, bytecode: &[u8]) -> Result<vk::ShaderModule> {
    let code = to_words(bytecode)?;
    let info = vk::ShaderModuleCreateInfo::builder()
        .code_size(bytecode.len())
        .code(&code);

    Ok(device.create_shader_module(&info, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_shader_reports_its_path() {
        let error = load("shaders/does-not-exist.spv").unwrap_err();
        match error.downcast_ref::<EngineError>() {
            Some(EngineError::ShaderLoad { path, .. }) => assert!(path.ends_with("does-not-exist.spv")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn bytecode_is_repacked_into_words() {
        let magic = 0x0723_0203u32.to_ne_bytes();
        let bytes = [magic, 7u32.to_ne_bytes()].concat();

        assert_eq!(to_words(&bytes).unwrap(), [0x0723_0203, 7]);
    }

    #[test]
    fn truncated_bytecode_is_rejected() {
        assert!(to_words(&[3, 2, 35, 7, 0]).is_err());
        assert!(to_words(&[]).is_err());
    }
}
