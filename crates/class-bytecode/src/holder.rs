// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use crate::body::Body;
use class_model::MethodId;
use log::debug;
use std::collections::BTreeMap;

/// Bodies of all methods that have code, keyed by method.
#[derive(Debug, Default)]
pub struct BodyHolder {
    bodies: BTreeMap<MethodId, Body>,
}

impl BodyHolder {
    pub fn add_body(&mut self, body: Body) {
        debug!("registering body of method {:?}", body.method);
        self.bodies.insert(body.method, body);
    }

    pub fn get_body(&self, method: MethodId) -> Option<&Body> {
        self.bodies.get(&method)
    }

    pub fn has_body(&self, method: MethodId) -> bool {
        self.bodies.contains_key(&method)
    }

    /// Bodies in method id order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }
}
