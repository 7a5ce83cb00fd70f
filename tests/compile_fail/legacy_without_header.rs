//! Test legacy struct without a leading ObjectHead error.
#![allow(dead_code)]

use univtype::TypeStruct;

#[derive(TypeStruct)]
#[univtype(legacy)]
#[repr(C)]
struct Counter {
    value: i64,
}

fn main() {}
