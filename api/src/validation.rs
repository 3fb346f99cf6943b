// (c) Meta Platforms, Inc. and affiliates. Confidential and proprietary.

//! Validation utilities for bus names and object paths

use anyhow::Result;

/// Maximum length for a well-known bus name
pub const MAX_BUS_NAME_LEN: usize = 255;

/// Checks if a character is valid inside a bus name element.
/// Valid characters are ASCII alphanumeric, hyphens and underscores.
pub fn is_valid_bus_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Checks if a character is valid inside an object path segment.
pub fn is_valid_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Validates a well-known bus name such as `org.example.Service`
pub fn validate_bus_name(name: &str) -> Result<()> {
    let len = name.len();
    if len == 0 || len > MAX_BUS_NAME_LEN {
        return Err(anyhow::anyhow!(
            "Bus name length must be between 1 and {} characters, got {}",
            MAX_BUS_NAME_LEN,
            len
        ));
    }

    let elements: Vec<&str> = name.split('.').collect();
    if elements.len() < 2 {
        return Err(anyhow::anyhow!(
            "Bus name must contain at least two elements separated by '.': {}",
            name
        ));
    }

    for element in elements {
        if element.is_empty() {
            return Err(anyhow::anyhow!("Bus name has an empty element: {}", name));
        }
        if element.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(anyhow::anyhow!(
                "Bus name element must not start with a digit: {}",
                name
            ));
        }
        if !element.chars().all(is_valid_bus_name_char) {
            return Err(anyhow::anyhow!(
                "Bus name can only contain ASCII alphanumeric characters, hyphens and underscores: {}",
                name
            ));
        }
    }

    Ok(())
}

/// Validates an object path such as `/org/example/Device0`
pub fn validate_object_path(path: &str) -> Result<()> {
    if path == "/" {
        return Ok(());
    }

    let Some(rest) = path.strip_prefix('/') else {
        return Err(anyhow::anyhow!("Object path must start with '/': {}", path));
    };

    for segment in rest.split('/') {
        if segment.is_empty() {
            return Err(anyhow::anyhow!(
                "Object path has an empty segment or trailing '/': {}",
                path
            ));
        }
        if !segment.chars().all(is_valid_path_char) {
            return Err(anyhow::anyhow!(
                "Object path can only contain ASCII alphanumeric characters and underscores: {}",
                path
            ));
        }
    }

    Ok(())
}
