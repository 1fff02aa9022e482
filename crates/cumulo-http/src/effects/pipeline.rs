use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::transport::{Transport, TransportPolicy};
use crate::data::{Context, Request, Response};
use crate::error::{Error, Result};

/// One stage of the request pipeline.
///
/// A policy may edit the request, delegate to the rest of the chain via
/// [`Next::run`] (any number of times), inspect or replace the response, or
/// answer without delegating at all. Policies are shared by every call on a
/// client, so per-call state belongs on the [`Request`], never on `self`.
#[async_trait]
pub trait Policy: Send + Sync {
    async fn send(&self, ctx: &Context, request: &mut Request, next: Next<'_>) -> Result<Response>;
}

/// The part of the chain after the current policy.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    policies: &'a [Arc<dyn Policy>],
}

impl<'a> Next<'a> {
    pub async fn run(self, ctx: &Context, request: &mut Request) -> Result<Response> {
        let Some((policy, rest)) = self.policies.split_first() else {
            return Err(Error::precondition("pipeline ended without a transport"));
        };
        policy.send(ctx, request, Next { policies: rest }).await
    }

    /// Policies left to run, including the transport.
    pub fn remaining(&self) -> usize { self.policies.len() }
}

/// Ordered policy chain ending in a transport.
///
/// Cloning is cheap; every clone shares the same policies, so one pipeline
/// can back any number of client facades.
#[derive(Clone)]
pub struct Pipeline {
    policies: Arc<[Arc<dyn Policy>]>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("policies", &self.policies.len()).finish()
    }
}

impl Pipeline {
    /// Build a pipeline that runs `policies` in order and then `transport`.
    pub fn new(policies: Vec<Arc<dyn Policy>>, transport: Arc<dyn Transport>) -> Self {
        let mut chain = policies;
        chain.push(Arc::new(TransportPolicy::new(transport)));
        Self { policies: chain.into() }
    }

    /// Send one logical request through every policy.
    pub async fn send(&self, ctx: &Context, request: &mut Request) -> Result<Response> {
        ctx.check()?;
        Next { policies: &self.policies }.run(ctx, request).await
    }

    pub fn len(&self) -> usize { self.policies.len() }

    pub fn is_empty(&self) -> bool { self.policies.is_empty() }
}
