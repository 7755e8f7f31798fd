use std::fmt;

use log::*;
use thiserror::Error;

/// Every kind of Vulkan object the renderer creates and later destroys.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Instance,
    DebugMessenger,
    Surface,
    Device,
    Swapchain,
    ImageViews,
    RenderPass,
    PipelineLayout,
    Pipeline,
    Framebuffers,
    CommandPool,
    SyncObjects,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0:?} was already created.")]
pub struct ChainError(pub Resource);

type Destroy = Box<dyn FnOnce()>;

/// The live Vulkan objects in the order they were created, each paired with
/// the call that destroys it.
///
/// Teardown walks the chain backwards so nothing is destroyed while a later
/// object still depends on it. Dropping the chain tears it down, which also
/// covers a renderer that failed halfway through initialization.
#[derive(Default)]
pub struct ResourceChain {
    live: Vec<(Resource, Destroy)>,
}

impl ResourceChain {
    pub fn push<F>(&mut self, resource: Resource, destroy: F) -> Result<(), ChainError>
    where
        F: FnOnce() + 'static,
    {
        if self.live.iter().any(|(r, _)| *r == resource) {
            return Err(ChainError(resource));
        }
        trace!("Created {:?}.", resource);
        self.live.push((resource, Box::new(destroy)));
        Ok(())
    }

    pub fn created(&self) -> Vec<Resource> {
        self.live.iter().map(|(r, _)| *r).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Destroys every live resource, newest first, and leaves the chain empty.
    pub fn teardown(&mut self) {
        while let Some((resource, destroy)) = self.live.pop() {
            debug!("Destroying {:?}.", resource);
            destroy();
        }
    }
}

/// Creates one handle per item, all or nothing: when a creation fails, the
/// handles made so far are destroyed, newest first, before the error is
/// returned.
pub fn create_each<T, H, E, C, D>(
    items: &[T],
    mut create: C,
    mut destroy: D,
) -> Result<Vec<H>, E>
where
    C: FnMut(&T) -> Result<H, E>,
    D: FnMut(H),
{
    let mut created = Vec::with_capacity(items.len());
    for item in items {
        match create(item) {
            Ok(handle) => created.push(handle),
            Err(error) => {
                created.into_iter().rev().for_each(&mut destroy);
                return Err(error);
            }
        }
    }
    Ok(created)
}

impl Drop for ResourceChain {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for ResourceChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.live.iter().map(|(r, _)| r))
            .finish()
    }
}
