//! Test missing #[repr(C)] error.
#![allow(dead_code)]

use univtype::TypeStruct;

#[derive(TypeStruct)]
struct Point {
    x: f64,
}

fn main() {}
