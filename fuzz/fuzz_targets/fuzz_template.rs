// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use chrono::{Local, TimeZone};
use folder_stuffer::TemplateVars;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    template: String,
    filename: String,
    groups: Vec<String>,
}

fuzz_target!(|input: Input| {
    let Some(date) = Local.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).single() else {
        return;
    };
    let mut vars = TemplateVars::from_date(date, &input.filename);
    for (i, group) in input.groups.iter().enumerate() {
        vars.insert(format!("group{}", i + 1), group.as_str());
    }

    let rendered = vars.render(&input.template);
    if !input.template.contains(['{', '}']) {
        assert_eq!(rendered.as_deref(), Ok(input.template.as_str()));
    }
});
