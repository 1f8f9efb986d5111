//! Conversion between resource amounts and Kubernetes-style quantity strings

use crate::error::{RecommendError, Result};
use crate::models::ResourceType;

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Render an amount: millicores below one core, binary units for memory bytes
pub fn format(resource: ResourceType, value: f64) -> String {
    match resource {
        ResourceType::Cpu => {
            if value < 1.0 {
                format!("{}m", (value * 1000.0).ceil() as i64)
            } else {
                format!("{}", value)
            }
        }
        ResourceType::Memory => {
            if value < KIB {
                format!("{}B", value as i64)
            } else if value < MIB {
                format!("{}k", (value / KIB) as i64)
            } else if value < GIB {
                format!("{}Mi", (value / MIB) as i64)
            } else {
                format!("{}Gi", (value / GIB) as i64)
            }
        }
    }
}

/// Parse a quantity string back into cores or bytes
pub fn parse(resource: ResourceType, text: &str) -> Result<f64> {
    let text = text.trim();
    let lower = text.to_ascii_lowercase();

    let (number, scale) = match resource {
        ResourceType::Cpu => match lower.strip_suffix('m') {
            Some(number) => (number, 1.0 / 1000.0),
            None => (lower.as_str(), 1.0),
        },
        ResourceType::Memory => {
            if let Some(number) = lower.strip_suffix("mi") {
                (number, MIB)
            } else if let Some(number) = lower.strip_suffix("gi") {
                (number, GIB)
            } else if let Some(number) = lower.strip_suffix('k') {
                (number, KIB)
            } else if let Some(number) = lower.strip_suffix('b') {
                (number, 1.0)
            } else {
                (lower.as_str(), 1.0)
            }
        }
    };

    let value: f64 = number.trim().parse().map_err(|_| {
        RecommendError::InvalidConfig(format!("invalid {} quantity: {:?}", resource, text))
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(RecommendError::InvalidConfig(format!(
            "invalid {} quantity: {:?}",
            resource, text
        )));
    }
    Ok(value * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cpu() {
        assert_eq!(format(ResourceType::Cpu, 0.25), "250m");
        assert_eq!(format(ResourceType::Cpu, 0.0101), "11m");
        assert_eq!(format(ResourceType::Cpu, 1.5), "1.5");
        assert_eq!(format(ResourceType::Cpu, 2.0), "2");
    }

    #[test]
    fn test_format_memory() {
        assert_eq!(format(ResourceType::Memory, 512.0), "512B");
        assert_eq!(format(ResourceType::Memory, 2048.0), "2k");
        assert_eq!(format(ResourceType::Memory, 300.0 * MIB), "300Mi");
        assert_eq!(format(ResourceType::Memory, 1.5 * GIB), "1Gi");
    }

    #[test]
    fn test_parse_quantities() {
        assert_eq!(parse(ResourceType::Cpu, "250m").unwrap(), 0.25);
        assert_eq!(parse(ResourceType::Cpu, "2").unwrap(), 2.0);
        assert_eq!(parse(ResourceType::Memory, "4k").unwrap(), 4096.0);
        assert_eq!(parse(ResourceType::Memory, "128Mi").unwrap(), 128.0 * MIB);
        assert_eq!(parse(ResourceType::Memory, "1Gi").unwrap(), GIB);
        assert_eq!(parse(ResourceType::Memory, "100B").unwrap(), 100.0);
        assert_eq!(parse(ResourceType::Memory, "1000").unwrap(), 1000.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse(ResourceType::Cpu, "lots"),
            Err(RecommendError::InvalidConfig(_))
        ));
        assert!(parse(ResourceType::Memory, "Mi").is_err());
        assert!(parse(ResourceType::Cpu, "-1").is_err());
    }
}
