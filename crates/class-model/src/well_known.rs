// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Names of classes and members the model and the backends treat specially.

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const THROWABLE: &str = "java.lang.Throwable";
pub const SYSTEM: &str = "java.lang.System";

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

/// Classes every program model contains, in registration order.
pub const PREDEFINED_CLASSES: &[&str] = &[OBJECT, STRING, THROWABLE];
