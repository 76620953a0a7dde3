//! Static deny-list checked before a script is evaluated
//!
//! A coarse lexical filter: it rejects obvious attempts to reach host
//! capabilities without spinning up an engine. Obfuscated code can slip past
//! it; the restricted engine is what actually enforces isolation.

use super::error::SandboxError;
use regex::Regex;
use std::sync::LazyLock;

static DENY_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bprocess\s*[.\[]", "process access"),
        (r"\brequire\s*\(", "module loading"),
        (r"\bimport\b", "module import"),
        (r"\beval\s*\(", "dynamic eval"),
        (r"\bFunction\s*\(", "function constructor"),
        (r"\bglobalThis\b|\bglobal\s*[.\[]", "global object access"),
        (r"__dirname|__filename", "host path access"),
        (r"\bchild_process\b", "process spawning"),
        (r"\b(exec|execSync|spawn|spawnSync|fork)\s*\(", "process spawning"),
        (
            r"\b(fs|net|os|http|https|dgram|vm|cluster|worker_threads|tls|dns)\s*\.",
            "host module access",
        ),
        (r"\.\s*constructor\b|__proto__", "prototype escape"),
        (r"\bDeno\b|\bBun\b", "runtime internals"),
    ]
    .into_iter()
    .map(|(pattern, reason)| (Regex::new(pattern).expect("valid deny pattern"), reason))
    .collect()
});

/// Check `code` against the deny-list and the size limit
pub fn check(code: &str, max_code_length: usize) -> Result<(), SandboxError> {
    if code.len() > max_code_length {
        return Err(SandboxError::CodeTooLarge {
            max: max_code_length,
            actual: code.len(),
        });
    }

    for (pattern, reason) in DENY_PATTERNS.iter() {
        if let Some(m) = pattern.find(code) {
            return Err(SandboxError::DenyPattern {
                reason: reason.to_string(),
                matched: m.as_str().to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied(code: &str) -> bool {
        matches!(check(code, 10_000), Err(SandboxError::DenyPattern { .. }))
    }

    #[test]
    fn test_dangerous_code_rejected() {
        assert!(denied("process.env.SECRET"));
        assert!(denied("let fs = require('fs')"));
        assert!(denied("import \"file\" as f;"));
        assert!(denied("eval(\"1 + 1\")"));
        assert!(denied("new Function('return this')()"));
        assert!(denied("globalThis.x = 1"));
        assert!(denied("fs.readFileSync('/etc/passwd')"));
        assert!(denied("exec('rm -rf /')"));
        assert!(denied("x.constructor.constructor('return 1')"));
    }

    #[test]
    fn test_ordinary_code_allowed() {
        assert!(check("let x = json.price * 2; x", 10_000).is_ok());
        assert!(check("args.items.len()", 10_000).is_ok());
        assert!(check("let processed = 1; processed + 1", 10_000).is_ok());
        assert!(check("\"evaluation\" + \" done\"", 10_000).is_ok());
    }

    #[test]
    fn test_code_length_limit() {
        let err = check("1 + 1", 3).unwrap_err();
        assert!(matches!(err, SandboxError::CodeTooLarge { max: 3, actual: 5 }));
    }
}
