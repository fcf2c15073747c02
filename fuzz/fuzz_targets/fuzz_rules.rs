// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use folder_stuffer::RuleSet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(rules) = RuleSet::from_json(text) {
            // decoded rules must survive a save/load cycle
            let json = serde_json::to_string(&rules).unwrap();
            let again = RuleSet::from_json(&json).unwrap();
            assert_eq!(rules.names(), again.names());
        }
    }
});
