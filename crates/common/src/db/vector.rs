//! pgvector text representation
//!
//! Vectors cross the SQL boundary as bracketed literals (`[0.1,-0.2]`),
//! cast with `::vector` on the way in and `::text` on the way out.

use crate::errors::{AppError, Result};

/// Format a vector as a pgvector literal
pub fn to_literal(vector: &[f32]) -> String {
    let parts: Vec<String> = vector.iter().map(|f| f.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Parse a pgvector literal
pub fn parse_literal(text: &str) -> Result<Vec<f32>> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| AppError::InvalidFormat {
            message: format!("not a vector literal: {:.32}", text),
        })?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim().parse::<f32>().map_err(|e| AppError::InvalidFormat {
                message: format!("bad vector component '{}': {}", part.trim(), e),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_format() {
        assert_eq!(to_literal(&[0.5, -1.0, 0.0]), "[0.5,-1,0]");
        assert_eq!(to_literal(&[]), "[]");
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal("[0.5,-1,2e-3]").unwrap(), vec![0.5, -1.0, 0.002]);
        assert_eq!(parse_literal(" [ 1 , 2 ] ").unwrap(), vec![1.0, 2.0]);
        assert!(parse_literal("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_literal("0.5,1").is_err());
        assert!(parse_literal("[a,b]").is_err());
    }
}
