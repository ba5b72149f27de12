// Power reading extraction from raw sampler output

use regex::Regex;
use std::sync::OnceLock;

use crate::core::format::EnergySample;

// Specific label first, then a looser fallback in case the tool rewords it.
const COMBINED_POWER_PATTERNS: &[&str] = &[
    r"(?i)Combined Power \(CPU \+ GPU(?: \+ ANE)?\):\s*(\d+)\s*mW",
    r"(?i)Combined Power.*?:\s*(\d+)\s*mW",
];

static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn patterns() -> &'static [Regex] {
    PATTERNS.get_or_init(|| {
        COMBINED_POWER_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("Invalid power pattern"))
            .collect()
    })
}

/// Returns the milliwatt reading carried by `line`, if any.
pub fn extract_milliwatts(line: &str) -> Option<EnergySample> {
    patterns().iter().find_map(|re| {
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<EnergySample>().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_label() {
        assert_eq!(
            extract_milliwatts("Combined Power (CPU + GPU + ANE): 1234 mW"),
            Some(1234)
        );
        assert_eq!(extract_milliwatts("Combined Power (CPU + GPU): 87 mW"), Some(87));
    }

    #[test]
    fn test_fallback_label() {
        assert_eq!(
            extract_milliwatts("Combined Power (CPU + GPU + ANE + NPU): 512 mW"),
            Some(512)
        );
        assert_eq!(extract_milliwatts("combined power total:  42mW"), Some(42));
    }

    #[test]
    fn test_non_matching_lines() {
        assert_eq!(extract_milliwatts(""), None);
        assert_eq!(extract_milliwatts("CPU Power: 900 mW"), None);
        assert_eq!(extract_milliwatts("Combined Power (CPU + GPU + ANE): -5 mW"), None);
        assert_eq!(extract_milliwatts("Combined Power (CPU + GPU + ANE): 12.5 W"), None);
        assert_eq!(
            extract_milliwatts("Combined Power (CPU + GPU + ANE): 99999999999 mW"),
            None
        );
    }

    #[test]
    fn test_line_order_preserved() {
        let lines = [
            "**** Processor usage ****",
            "Combined Power (CPU + GPU + ANE): 10 mW",
            "GPU Power: 3 mW",
            "Combined Power (CPU + GPU + ANE): 20 mW",
            "Combined Power (CPU + GPU + ANE): 30 mW",
        ];
        let readings: Vec<_> = lines.iter().filter_map(|l| extract_milliwatts(l)).collect();
        assert_eq!(readings, vec![10, 20, 30]);
    }
}
