//! Response-shaping middleware chain
//!
//! Interceptors wrap the handler that produces a [`Body`]. Each one sees the
//! request on the way in and may rewrite the response on the way out, so the
//! first entry in the stack is the outermost layer.

use crate::{Body, Error, Result};
use async_trait::async_trait;
use http::{Request, Response};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by a terminal handler
pub type ResponseFuture = Pin<Box<dyn Future<Output = Result<Response<Body>>> + Send>>;

/// Terminal handler at the end of a chain
pub type HandlerFn = Box<dyn Fn(Request<Body>) -> ResponseFuture + Send + Sync>;

/// A layer that can observe the request and rewrite the response
#[async_trait]
pub trait Middleware: Send + Sync + fmt::Debug {
    /// Handle `req`, delegating to `next` for the inner layers
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>>;
}

/// Cursor into a middleware stack
pub struct Next {
    middleware_stack: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    final_handler: Option<Arc<HandlerFn>>,
}

impl Next {
    /// Chain with no terminal handler
    pub fn new(middleware_stack: Arc<[Arc<dyn Middleware>]>) -> Self {
        Self {
            middleware_stack,
            index: 0,
            final_handler: None,
        }
    }

    /// Chain ending in `handler`
    pub fn with_handler(middleware_stack: Arc<[Arc<dyn Middleware>]>, handler: HandlerFn) -> Self {
        Self {
            middleware_stack,
            index: 0,
            final_handler: Some(Arc::new(handler)),
        }
    }

    /// Layers still ahead of this cursor
    pub fn remaining(&self) -> usize {
        self.middleware_stack.len().saturating_sub(self.index)
    }

    /// Run the next middleware, or the handler once the stack is exhausted
    pub async fn run(self, req: Request<Body>) -> Result<Response<Body>> {
        let Some(middleware) = self.middleware_stack.get(self.index).cloned() else {
            return match self.final_handler {
                // Call the final handler
                Some(handler) => handler(req).await,
                // Reached end of chain without handler
                None => Err(Error::Internal(
                    "Middleware chain completed without handler".to_string(),
                )),
            };
        };

        let next = self.advance();
        middleware.call(req, next).await
    }

    fn advance(self) -> Self {
        Self {
            index: self.index + 1,
            ..self
        }
    }
}

impl Clone for Next {
    fn clone(&self) -> Self {
        Self {
            middleware_stack: Arc::clone(&self.middleware_stack),
            index: self.index,
            final_handler: self.final_handler.clone(),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &self.remaining())
            .field("has_handler", &self.final_handler.is_some())
            .finish()
    }
}
