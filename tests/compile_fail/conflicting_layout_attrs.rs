//! Test legacy and pure given together error.
#![allow(dead_code)]

use univtype::TypeStruct;

#[derive(TypeStruct)]
#[univtype(legacy, pure)]
#[repr(C)]
struct Point {
    x: f64,
}

fn main() {}
