// Queue family resolution
//
// Finds which queue families of a GPU can do graphics and which can present
// to our surface. One family may serve both roles.

use ash::prelude::VkResult;
use ash::vk;

use super::error::{SetupError, SetupResult};
use super::VulkanContext;

/// Graphics/present family indices as found on a device, possibly incomplete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

/// Both roles assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    pub fn find(
        ctx: &VulkanContext,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Self {
        let families = unsafe {
            ctx.instance
                .get_physical_device_queue_family_properties(physical_device)
        };

        Self::resolve(&families, |index| unsafe {
            ctx.surface_loader
                .get_physical_device_surface_support(physical_device, index, surface)
        })
    }

    /// First graphics-capable family and first present-capable family, in
    /// index order. Stops querying once both are known.
    pub fn resolve(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> VkResult<bool>,
    ) -> Self {
        let mut found = Self::default();

        for (index, family) in (0u32..).zip(families) {
            if found.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                found.graphics = Some(index);
            }

            if found.present.is_none() {
                match supports_present(index) {
                    Ok(true) => found.present = Some(index),
                    Ok(false) => {}
                    Err(e) => log::error!(
                        "Unable to query present support of queue family {} - Error {}",
                        index,
                        e
                    ),
                }
            }

            if found.is_complete() {
                break;
            }
        }

        found
    }

    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Complete indices, or the error naming what is missing
    pub fn require(&self) -> SetupResult<QueueFamilyIndices> {
        match (self.graphics, self.present) {
            (Some(graphics), Some(present)) => Ok(QueueFamilyIndices { graphics, present }),
            (graphics, present) => Err(SetupError::IncompleteQueueFamilies { graphics, present }),
        }
    }

    /// Distinct family indices, graphics first. Empty if incomplete.
    pub fn unique_indices(&self) -> Vec<u32> {
        match self.require() {
            Ok(indices) => indices.unique(),
            Err(e) => {
                log::warn!("{}", e);
                Vec::new()
            }
        }
    }
}

impl QueueFamilyIndices {
    /// `[graphics]` when shared, else `[graphics, present]`
    pub fn unique(&self) -> Vec<u32> {
        if self.graphics == self.present {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}
