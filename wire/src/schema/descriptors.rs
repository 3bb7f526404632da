use bytemuck::{Pod, Zeroable};

use super::{ChainedStruct, CompilationMessageType};
use crate::arena::DeserializeAllocator;
use crate::buffer::{DeserializeBuffer, SerializeBuffer};
use crate::chain::{chain_extra_size, deserialize_chain, serialize_chain};
use crate::error::WireResult;
use crate::object::{
    BindGroupLayout, Buffer, ObjectId, ObjectIdProvider, ObjectIdResolver, PipelineLayout,
    Sampler, ShaderModule, TextureView,
};
use crate::record::{
    WidenInto, WireBool, WireRecord, deserialize_optional_string, deserialize_records,
    deserialize_string, optional_string_extra_size, optional_string_header, records_extra_size,
    serialize_optional_string, serialize_records, serialize_string, string_extra_size, sum_sizes,
};

/// Descriptors whose only fields are a chain and an optional label.
macro_rules! labelled_descriptor {
    ($(#[$meta:meta])* $name:ident, $transfer:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $name {
            pub chain: Vec<ChainedStruct>,
            pub label: Option<String>,
        }

        #[derive(Debug, Clone, Copy, Pod, Zeroable)]
        #[repr(C)]
        pub struct $transfer {
            pub label_strlen: u64,
            pub has_next_in_chain: WireBool,
            pub has_label: WireBool,
        }

        impl WireRecord for $name {
            type Transfer = $transfer;

            fn extra_required_size(&self) -> WireResult<usize> {
                sum_sizes([
                    optional_string_extra_size(self.label.as_deref()),
                    chain_extra_size(&self.chain),
                ])
            }

            fn serialize(
                &self,
                transfer: &mut Self::Transfer,
                buffer: &mut SerializeBuffer<'_>,
                provider: &dyn ObjectIdProvider,
            ) -> WireResult<()> {
                (transfer.label_strlen, transfer.has_label) =
                    optional_string_header(self.label.as_deref());
                transfer.has_next_in_chain = WireBool::from(!self.chain.is_empty());

                serialize_optional_string(self.label.as_deref(), buffer)?;
                serialize_chain(&self.chain, buffer, provider)
            }

            fn deserialize(
                transfer: &Self::Transfer,
                buffer: &mut DeserializeBuffer<'_>,
                allocator: &mut dyn DeserializeAllocator,
                resolver: &dyn ObjectIdResolver,
            ) -> WireResult<Self> {
                let label = deserialize_optional_string(
                    transfer.has_label,
                    transfer.label_strlen,
                    buffer,
                    allocator,
                )?;
                let chain =
                    deserialize_chain(transfer.has_next_in_chain, buffer, allocator, resolver)?;
                Ok(Self { chain, label })
            }
        }
    };
}

labelled_descriptor!(ShaderModuleDescriptor, ShaderModuleDescriptorTransfer);
labelled_descriptor!(CommandEncoderDescriptor, CommandEncoderDescriptorTransfer);
labelled_descriptor!(CommandBufferDescriptor, CommandBufferDescriptorTransfer);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BufferDescriptor {
    pub chain: Vec<ChainedStruct>,
    pub label: Option<String>,
    pub usage: u32,
    pub size: u64,
    pub mapped_at_creation: bool,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct BufferDescriptorTransfer {
    pub label_strlen: u64,
    pub size: u64,
    pub usage: u32,
    pub has_next_in_chain: WireBool,
    pub has_label: WireBool,
    pub mapped_at_creation: WireBool,
}

impl WireRecord for BufferDescriptor {
    type Transfer = BufferDescriptorTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        sum_sizes([
            optional_string_extra_size(self.label.as_deref()),
            chain_extra_size(&self.chain),
        ])
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        (transfer.label_strlen, transfer.has_label) = optional_string_header(self.label.as_deref());
        transfer.size = self.size.widen();
        transfer.usage = self.usage.widen();
        transfer.mapped_at_creation = self.mapped_at_creation.into();
        transfer.has_next_in_chain = WireBool::from(!self.chain.is_empty());

        serialize_optional_string(self.label.as_deref(), buffer)?;
        serialize_chain(&self.chain, buffer, provider)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        let label =
            deserialize_optional_string(transfer.has_label, transfer.label_strlen, buffer, allocator)?;
        let chain = deserialize_chain(transfer.has_next_in_chain, buffer, allocator, resolver)?;
        Ok(Self {
            chain,
            label,
            usage: transfer.usage,
            size: transfer.size,
            mapped_at_creation: transfer.mapped_at_creation.get()?,
        })
    }
}

/// Pipeline-overridable constant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantEntry {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ConstantEntryTransfer {
    pub key_strlen: u64,
    pub value: f64,
}

impl WireRecord for ConstantEntry {
    type Transfer = ConstantEntryTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        string_extra_size(&self.key)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.key_strlen = self.key.len().widen();
        transfer.value = self.value.widen();
        serialize_string(&self.key, buffer)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            key: deserialize_string(transfer.key_strlen, buffer, allocator)?,
            value: transfer.value,
        })
    }
}

/// Shader stage of a pipeline. Embedded by value in its owner's transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgrammableStageDescriptor {
    pub module: ShaderModule,
    pub entry_point: String,
    pub constants: Vec<ConstantEntry>,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ProgrammableStageDescriptorTransfer {
    pub entry_point_strlen: u64,
    pub constant_count: u64,
    pub module: ObjectId,
    pub padding: u32,
}

impl WireRecord for ProgrammableStageDescriptor {
    type Transfer = ProgrammableStageDescriptorTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        sum_sizes([
            string_extra_size(&self.entry_point),
            records_extra_size(&self.constants),
        ])
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.module = provider.get_id(self.module)?;
        transfer.entry_point_strlen = self.entry_point.len().widen();
        transfer.constant_count = self.constants.len().widen();

        serialize_string(&self.entry_point, buffer)?;
        serialize_records(&self.constants, buffer, provider)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        let module = resolver.get_from_id(transfer.module)?;
        let entry_point = deserialize_string(transfer.entry_point_strlen, buffer, allocator)?;
        let constants = deserialize_records(transfer.constant_count, buffer, allocator, resolver)?;
        Ok(Self {
            module,
            entry_point,
            constants,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputePipelineDescriptor {
    pub chain: Vec<ChainedStruct>,
    pub label: Option<String>,
    pub layout: Option<PipelineLayout>,
    pub compute: ProgrammableStageDescriptor,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct ComputePipelineDescriptorTransfer {
    pub label_strlen: u64,
    pub compute: ProgrammableStageDescriptorTransfer,
    pub layout: ObjectId,
    pub has_next_in_chain: WireBool,
    pub has_label: WireBool,
    pub padding: u32,
}

impl WireRecord for ComputePipelineDescriptor {
    type Transfer = ComputePipelineDescriptorTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        sum_sizes([
            optional_string_extra_size(self.label.as_deref()),
            self.compute.extra_required_size(),
            chain_extra_size(&self.chain),
        ])
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        (transfer.label_strlen, transfer.has_label) = optional_string_header(self.label.as_deref());
        transfer.layout = provider.get_optional_id(self.layout)?;
        transfer.has_next_in_chain = WireBool::from(!self.chain.is_empty());

        serialize_optional_string(self.label.as_deref(), buffer)?;
        self.compute.serialize(&mut transfer.compute, buffer, provider)?;
        serialize_chain(&self.chain, buffer, provider)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        let layout = resolver.get_optional_from_id(transfer.layout)?;
        let label =
            deserialize_optional_string(transfer.has_label, transfer.label_strlen, buffer, allocator)?;
        let compute =
            ProgrammableStageDescriptor::deserialize(&transfer.compute, buffer, allocator, resolver)?;
        let chain = deserialize_chain(transfer.has_next_in_chain, buffer, allocator, resolver)?;
        Ok(Self {
            chain,
            label,
            layout,
            compute,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BindGroupEntry {
    pub binding: u32,
    pub buffer: Option<Buffer>,
    pub offset: u64,
    pub size: u64,
    pub sampler: Option<Sampler>,
    pub texture_view: Option<TextureView>,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct BindGroupEntryTransfer {
    pub offset: u64,
    pub size: u64,
    pub binding: u32,
    pub buffer: ObjectId,
    pub sampler: ObjectId,
    pub texture_view: ObjectId,
}

impl WireRecord for BindGroupEntry {
    type Transfer = BindGroupEntryTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        Ok(0)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        _buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.binding = self.binding.widen();
        transfer.offset = self.offset.widen();
        transfer.size = self.size.widen();
        transfer.buffer = provider.get_optional_id(self.buffer)?;
        transfer.sampler = provider.get_optional_id(self.sampler)?;
        transfer.texture_view = provider.get_optional_id(self.texture_view)?;
        Ok(())
    }

    fn deserialize(
        transfer: &Self::Transfer,
        _buffer: &mut DeserializeBuffer<'_>,
        _allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            binding: transfer.binding,
            buffer: resolver.get_optional_from_id(transfer.buffer)?,
            offset: transfer.offset,
            size: transfer.size,
            sampler: resolver.get_optional_from_id(transfer.sampler)?,
            texture_view: resolver.get_optional_from_id(transfer.texture_view)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindGroupDescriptor {
    pub chain: Vec<ChainedStruct>,
    pub label: Option<String>,
    pub layout: BindGroupLayout,
    pub entries: Vec<BindGroupEntry>,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct BindGroupDescriptorTransfer {
    pub label_strlen: u64,
    pub entry_count: u64,
    pub layout: ObjectId,
    pub has_next_in_chain: WireBool,
    pub has_label: WireBool,
    pub padding: u32,
}

impl WireRecord for BindGroupDescriptor {
    type Transfer = BindGroupDescriptorTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        sum_sizes([
            optional_string_extra_size(self.label.as_deref()),
            records_extra_size(&self.entries),
            chain_extra_size(&self.chain),
        ])
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        (transfer.label_strlen, transfer.has_label) = optional_string_header(self.label.as_deref());
        transfer.layout = provider.get_id(self.layout)?;
        transfer.entry_count = self.entries.len().widen();
        transfer.has_next_in_chain = WireBool::from(!self.chain.is_empty());

        serialize_optional_string(self.label.as_deref(), buffer)?;
        serialize_records(&self.entries, buffer, provider)?;
        serialize_chain(&self.chain, buffer, provider)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        let layout = resolver.get_from_id(transfer.layout)?;
        let label =
            deserialize_optional_string(transfer.has_label, transfer.label_strlen, buffer, allocator)?;
        let entries = deserialize_records(transfer.entry_count, buffer, allocator, resolver)?;
        let chain = deserialize_chain(transfer.has_next_in_chain, buffer, allocator, resolver)?;
        Ok(Self {
            chain,
            label,
            layout,
            entries,
        })
    }
}

/// One diagnostic produced while compiling a shader module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationMessage {
    pub message: Option<String>,
    pub kind: CompilationMessageType,
    pub line_num: u64,
    pub line_pos: u64,
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct CompilationMessageTransfer {
    pub message_strlen: u64,
    pub line_num: u64,
    pub line_pos: u64,
    pub offset: u64,
    pub length: u64,
    pub kind: u32,
    pub has_message: WireBool,
}

impl WireRecord for CompilationMessage {
    type Transfer = CompilationMessageTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        optional_string_extra_size(self.message.as_deref())
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        _provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        (transfer.message_strlen, transfer.has_message) =
            optional_string_header(self.message.as_deref());
        transfer.kind = self.kind.to_wire();
        transfer.line_num = self.line_num.widen();
        transfer.line_pos = self.line_pos.widen();
        transfer.offset = self.offset.widen();
        transfer.length = self.length.widen();
        serialize_optional_string(self.message.as_deref(), buffer)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        _resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            message: deserialize_optional_string(
                transfer.has_message,
                transfer.message_strlen,
                buffer,
                allocator,
            )?,
            kind: CompilationMessageType::decode(transfer.kind)?,
            line_num: transfer.line_num,
            line_pos: transfer.line_pos,
            offset: transfer.offset,
            length: transfer.length,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompilationInfo {
    pub messages: Vec<CompilationMessage>,
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct CompilationInfoTransfer {
    pub message_count: u64,
}

impl WireRecord for CompilationInfo {
    type Transfer = CompilationInfoTransfer;

    fn extra_required_size(&self) -> WireResult<usize> {
        records_extra_size(&self.messages)
    }

    fn serialize(
        &self,
        transfer: &mut Self::Transfer,
        buffer: &mut SerializeBuffer<'_>,
        provider: &dyn ObjectIdProvider,
    ) -> WireResult<()> {
        transfer.message_count = self.messages.len().widen();
        serialize_records(&self.messages, buffer, provider)
    }

    fn deserialize(
        transfer: &Self::Transfer,
        buffer: &mut DeserializeBuffer<'_>,
        allocator: &mut dyn DeserializeAllocator,
        resolver: &dyn ObjectIdResolver,
    ) -> WireResult<Self> {
        Ok(Self {
            messages: deserialize_records(transfer.message_count, buffer, allocator, resolver)?,
        })
    }
}
