use bytemuck::{Pod, Zeroable};

use crate::arena::DeserializeAllocator;
use crate::buffer::{DeserializeBuffer, SerializeBuffer};
use crate::chain::{ChainedRecord, SType, chained_structs};
use crate::error::WireResult;
use crate::object::{ObjectIdProvider, ObjectIdResolver};
use crate::record::{
    WidenInto, WireBool, WireRecord, deserialize_slice, deserialize_string, serialize_slice,
    serialize_string, slice_extra_size, string_extra_size,
};

impl SType {
    pub const SHADER_MODULE_SPIRV_DESCRIPTOR: SType = SType(0x0000_0001);
    pub const SHADER_MODULE_WGSL_DESCRIPTOR: SType = SType(0x0000_0006);
    pub const PRIMITIVE_DEPTH_CLIP_CONTROL: SType = SType(0x0000_0007);
    pub const DAWN_ENCODER_INTERNAL_USAGE_DESCRIPTOR: SType = SType(0x0000_03EB);
}

chained_structs! {
    /// Extension node of any extensible descriptor.
    pub enum ChainedStruct {
        ShaderModuleSpirv(ShaderModuleSpirvDescriptor),
        ShaderModuleWgsl(ShaderModuleWgslDescriptor),
        PrimitiveDepthClipControl(PrimitiveDepthClipControl),
        DawnEncoderInternalUsage(DawnEncoderInternalUsageDescriptor),
    }
}

/// SPIR-V words of a shader module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderModuleSpirvDescriptor {
    pub code: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ShaderModuleSpirvDescriptorTransfer {
    pub code_size: u64,
}

impl WireRecord for ShaderModuleSpirvDescriptor {
    type Transfer = ShaderModuleSpirvDescriptorTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        slice_extra_size(&self.code)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.code_size = self.code.len().widen();
        serialize_slice(&self.code, buffer)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            code: deserialize_slice(transfer.code_size, buffer, allocator)?,
        })
    }
}

impl ChainedRecord for ShaderModuleSpirvDescriptor {
    const S_TYPE: SType = SType::SHADER_MODULE_SPIRV_DESCRIPTOR;
}

/// WGSL source of a shader module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderModuleWgslDescriptor {
    pub code: String,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ShaderModuleWgslDescriptorTransfer {
    pub code_strlen: u64,
}

impl WireRecord for ShaderModuleWgslDescriptor {
    type Transfer = ShaderModuleWgslDescriptorTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        string_extra_size(&self.code)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.code_strlen = self.code.len().widen();
        serialize_string(&self.code, buffer)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            code: deserialize_string(transfer.code_strlen, buffer, allocator)?,
        })
    }
}

impl ChainedRecord for ShaderModuleWgslDescriptor {
    const S_TYPE: SType = SType::SHADER_MODULE_WGSL_DESCRIPTOR;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrimitiveDepthClipControl {
    pub unclipped_depth: bool,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct PrimitiveDepthClipControlTransfer {
    pub unclipped_depth: WireBool,
}

impl WireRecord for PrimitiveDepthClipControl {
    type Transfer = PrimitiveDepthClipControlTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        Ok(0)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        _buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.unclipped_depth = self.unclipped_depth.into();
        Ok(())
    }

    fn deserialize(
        transfer: &Self::Transfer,
        _buffer: &mut DeserializeBuffer<'_>,
        _allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            unclipped_depth: transfer.unclipped_depth.get()?,
        })
    }
}

impl ChainedRecord for PrimitiveDepthClipControl {
    const S_TYPE: SType = SType::PRIMITIVE_DEPTH_CLIP_CONTROL;
}

/// Lets an encoder use internal usages when validating resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DawnEncoderInternalUsageDescriptor {
    pub use_internal_usages: bool,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct DawnEncoderInternalUsageDescriptorTransfer {
    pub use_internal_usages: WireBool,
}

impl WireRecord for DawnEncoderInternalUsageDescriptor {
    type Transfer = DawnEncoderInternalUsageDescriptorTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        Ok(0)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        _buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.use_internal_usages = self.use_internal_usages.into();
        Ok(())
    }

    fn deserialize(
        transfer: &Self::Transfer,
        _buffer: &mut DeserializeBuffer<'_>,
        _allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            use_internal_usages: transfer.use_internal_usages.get()?,
        })
    }
}

impl ChainedRecord for DawnEncoderInternalUsageDescriptor {
    const S_TYPE: SType = SType::DAWN_ENCODER_INTERNAL_USAGE_DESCRIPTOR;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::WireDeserializeAllocator;
    use crate::chain::{ChainNode, chain_extra_size, deserialize_chain, serialize_chain};
    use crate::object::NoObjects;

    #[test]
    fn chain_round_trips_in_order() {
        let chain = vec![
            ChainedStruct::from(ShaderModuleWgslDescriptor {
                code: "@compute fn main() {}".into(),
            }),
            ChainedStruct::from(PrimitiveDepthClipControl {
                unclipped_depth: true,
            }),
            ChainedStruct::from(ShaderModuleSpirvDescriptor {
                code: vec![0x0723_0203, 1, 2],
            }),
        ];

        let size = chain_extra_size(&chain).unwrap();
        let mut bytes = vec![0u8; size];
        let mut buffer = SerializeBuffer::new(&mut bytes);
        serialize_chain(&chain, &mut buffer, &NoObjects).unwrap();
        assert_eq!(buffer.available_size(), 0);

        let mut arena = WireDeserializeAllocator::new(4096);
        let mut reader = DeserializeBuffer::new(&bytes);
        let decoded: Vec<ChainedStruct> =
            deserialize_chain(WireBool::TRUE, &mut reader, &mut arena, &NoObjects).unwrap();
        assert_eq!(decoded, chain);
        assert_eq!(reader.available_size(), 0);
    }

    #[test]
    fn empty_chain_occupies_nothing() {
        let chain: Vec<ChainedStruct> = Vec::new();
        assert_eq!(chain_extra_size(&chain), Ok(0));

        let mut arena = WireDeserializeAllocator::new(16);
        let decoded: Vec<ChainedStruct> = deserialize_chain(
            WireBool::FALSE,
            &mut DeserializeBuffer::new(&[]),
            &mut arena,
            &NoObjects,
        )
        .unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn node_sizes_include_the_header() {
        let node = ChainedStruct::from(DawnEncoderInternalUsageDescriptor {
            use_internal_usages: true,
        });
        assert_eq!(node.s_type(), SType::DAWN_ENCODER_INTERNAL_USAGE_DESCRIPTOR);
        assert_eq!(node.body_required_size(), Ok(8));
        assert_eq!(chain_extra_size(&[node]), Ok(16));
    }
}
