use std::sync::Arc;
use vulkano::{
    buffer::{
        allocator::{SubbufferAllocator, SubbufferAllocatorCreateInfo},
        BufferUsage,
    },
    command_buffer::allocator::{
        StandardCommandBufferAllocator,
        StandardCommandBufferAllocatorCreateInfo,
    },
    descriptor_set::allocator::{
        StandardDescriptorSetAllocator,
        StandardDescriptorSetAllocatorCreateInfo,
    },
    device::Device,
    memory::allocator::{MemoryTypeFilter, StandardMemoryAllocator},
};

// The standard allocators are meant to live for the whole program. Per draw
// data (uniform blocks, overlay vertices, billboard points) changes every
// frame so it goes through the subbuffer allocators, which hand out slices
// of larger arenas instead of allocating device memory each time.

pub struct Memory {
    pub memory_allocator: Arc<StandardMemoryAllocator>,
    pub set_allocator: StandardDescriptorSetAllocator,
    pub command_buffer_allocator: Arc<StandardCommandBufferAllocator>,
    pub uniform_allocator: SubbufferAllocator,
    pub vertex_allocator: SubbufferAllocator,
}

impl Memory {
    pub fn new(device: &Arc<Device>) -> Self {
        let memory_allocator =
            Arc::new(StandardMemoryAllocator::new_default(device.clone()));
        let per_frame = |buffer_usage| {
            SubbufferAllocator::new(
                memory_allocator.clone(),
                SubbufferAllocatorCreateInfo {
                    buffer_usage,
                    memory_type_filter: MemoryTypeFilter::PREFER_DEVICE
                        | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                    ..Default::default()
                },
            )
        };
        let uniform_allocator = per_frame(BufferUsage::UNIFORM_BUFFER);
        let vertex_allocator = per_frame(BufferUsage::VERTEX_BUFFER);
        Self {
            set_allocator: StandardDescriptorSetAllocator::new(
                device.clone(),
                StandardDescriptorSetAllocatorCreateInfo::default(),
            ),
            command_buffer_allocator: Arc::new(
                StandardCommandBufferAllocator::new(
                    device.clone(),
                    StandardCommandBufferAllocatorCreateInfo::default(),
                ),
            ),
            memory_allocator,
            uniform_allocator,
            vertex_allocator,
        }
    }
}
