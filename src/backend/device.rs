// Vulkan Device - Core GPU interface
//
// Responsibilities:
// - Physical device selection (prefer discrete GPU)
// - Queue creation requests, one per distinct family
// - Logical device + graphics/present queues

use std::ffi::CStr;

use ash::prelude::VkResult;
use ash::vk;

use super::error::{SetupError, SetupResult};
use super::queue_family::{QueueFamilies, QueueFamilyIndices};
use super::surface::SurfaceSupport;
use super::VulkanContext;

/// Device extensions every candidate GPU must offer
const REQUIRED_DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Each family gets a single queue at top priority
static QUEUE_PRIORITIES: [f32; 1] = [1.0];

/// Logical device with automatic cleanup
pub struct Device {
    pub device: ash::Device,
    pub physical_device: vk::PhysicalDevice,

    // Queue handles, the same queue when the families coincide
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    families: QueueFamilyIndices,
}

impl Device {
    /// Create the logical device on `physical_device`
    ///
    /// # Arguments
    /// * `ctx` - Instance the physical device was enumerated from
    /// * `families` - Resolved graphics/present families on that device
    pub fn new(
        ctx: &VulkanContext,
        physical_device: vk::PhysicalDevice,
        families: QueueFamilyIndices,
    ) -> SetupResult<Self> {
        let queue_create_infos = queue_create_infos(&families);
        let extensions: Vec<_> = REQUIRED_DEVICE_EXTENSIONS
            .iter()
            .map(|name| name.as_ptr())
            .collect();
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = unsafe { ctx.instance.create_device(physical_device, &create_info, None) }
            .map_err(|e| {
                log::error!("Unable to create logical device - Error {}", e);
                SetupError::DeviceCreation(e)
            })?;

        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };

        log::info!(
            "Created logical device ({} queue famil{})",
            queue_create_infos.len(),
            if queue_create_infos.len() == 1 { "y" } else { "ies" }
        );

        Ok(Self {
            device,
            physical_device,
            graphics_queue,
            present_queue,
            families,
        })
    }

    pub fn families(&self) -> QueueFamilyIndices {
        self.families
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device...");

        if let Err(e) = self.wait_idle() {
            log::warn!("Device did not go idle before destruction: {}", e);
        }

        unsafe { self.device.destroy_device(None) };
    }
}

/// One request per distinct family. The driver rejects duplicates.
pub fn queue_create_infos(families: &QueueFamilyIndices) -> Vec<vk::DeviceQueueCreateInfo<'static>> {
    families
        .unique()
        .into_iter()
        .map(|index| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(index)
                .queue_priorities(&QUEUE_PRIORITIES)
        })
        .collect()
}

/// A GPU that passed every suitability check
#[derive(Debug, Clone, Copy)]
pub struct PhysicalDeviceChoice {
    pub physical_device: vk::PhysicalDevice,
    pub families: QueueFamilyIndices,
}

/// Pick the best GPU that can present to `surface`
pub fn pick_physical_device(
    ctx: &VulkanContext,
    surface: vk::SurfaceKHR,
) -> SetupResult<PhysicalDeviceChoice> {
    let devices = unsafe { ctx.instance.enumerate_physical_devices() }.map_err(|result| {
        SetupError::Enumeration {
            what: "physical devices",
            result,
        }
    })?;

    if devices.is_empty() {
        log::error!("No Vulkan-capable GPU found");
        return Err(SetupError::NoSuitableDevice);
    }

    let mut candidates = Vec::new();

    for physical_device in devices {
        let props = unsafe { ctx.instance.get_physical_device_properties(physical_device) };
        let name = device_name(&props);

        let families = match check_physical_device(ctx, physical_device, surface) {
            Ok(families) => families,
            Err(reason) => {
                log::warn!("Skipping physical device (`{}`): {}", name, reason);
                continue;
            }
        };

        let score = device_type_score(props.device_type);
        log::info!("Candidate GPU `{}` ({:?}, score {})", name, props.device_type, score);

        candidates.push((
            score,
            (
                PhysicalDeviceChoice {
                    physical_device,
                    families,
                },
                props,
            ),
        ));
    }

    let Some((choice, props)) = best_candidate(candidates) else {
        log::error!("No suitable GPU found");
        return Err(SetupError::NoSuitableDevice);
    };

    log::info!("Selected GPU: {}", device_name(&props));
    log::info!(
        "API Version: {}.{}.{}",
        vk::api_version_major(props.api_version),
        vk::api_version_minor(props.api_version),
        vk::api_version_patch(props.api_version)
    );

    Ok(choice)
}

fn check_physical_device(
    ctx: &VulkanContext,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<QueueFamilyIndices, String> {
    let found = QueueFamilies::find(ctx, physical_device, surface);
    let families = found.require().map_err(|e| e.to_string())?;
    log::debug!("Queue families in use: {:?}", found.unique_indices());

    let available = unsafe {
        ctx.instance
            .enumerate_device_extension_properties(physical_device)
    }
    .map_err(|e| format!("unable to list device extensions ({})", e))?;
    let available: Vec<&CStr> = available
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .collect();

    if let Some(missing) = missing_extension(&available, REQUIRED_DEVICE_EXTENSIONS) {
        return Err(format!("missing device extension {:?}", missing));
    }

    // Only meaningful once the swapchain extension is known to be there
    if !SurfaceSupport::probe(ctx, physical_device, surface).is_adequate() {
        return Err("insufficient swapchain support".to_string());
    }

    Ok(families)
}

/// First required extension not in `available`
fn missing_extension<'a>(available: &[&CStr], required: &[&'a CStr]) -> Option<&'a CStr> {
    required
        .iter()
        .copied()
        .find(|name| !available.iter().any(|have| have == name))
}

/// Highest score wins; on a tie the earliest candidate is kept
fn best_candidate<T>(candidates: impl IntoIterator<Item = (u32, T)>) -> Option<T> {
    let mut best: Option<(u32, T)> = None;
    for (score, candidate) in candidates {
        if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Higher is better
pub fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 10,
        _ => 1,
    }
}

fn device_name(props: &vk::PhysicalDeviceProperties) -> String {
    props
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<unnamed>".to_string())
}
