//! Test deriving on an enum error.
#![allow(dead_code)]

use univtype::TypeStruct;

#[derive(TypeStruct)]
#[repr(C)]
enum Shape {
    Circle,
    Square,
}

fn main() {}
