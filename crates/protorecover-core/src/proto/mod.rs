//! Proto definition rendering module.
//!
//! This module turns a single decoded `FileDescriptorProto` back into
//! human-readable `.proto` source text.
//!
//! ## Layout of the output
//!
//! 1. `syntax` declaration (the descriptor's own, or the configured default)
//! 2. `package` declaration when the package is non-empty
//! 3. one `import` per dependency, qualified `public`/`weak` from the index sets
//! 4. file options
//! 5. services, then messages, then enums, then extensions
//!
//! Type references are shortened relative to the file's package with
//! [`resolve_type_name`]. Map fields are synthesized back from their
//! desugared map-entry messages, and fields sharing a oneof index are grouped
//! into named `oneof` blocks.

mod names;

use crate::error::{Error, Result};
use crate::MAX_FIELD_NUMBER;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    MethodDescriptorProto, ServiceDescriptorProto,
};
use std::collections::{HashMap, HashSet};

pub use names::{logical_name, resolve_type_name};
use names::{escape_string, local_name, to_lower_camel_case};

/// Configuration for proto rendering
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Indentation string (default: 2 spaces)
    pub indent_str: String,
    /// Syntax assumed when a descriptor does not declare one (default: proto2)
    pub default_syntax: ProtoSyntax,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            default_syntax: ProtoSyntax::Proto2,
        }
    }
}

impl RendererConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets the syntax used for descriptors that omit one
    pub fn default_syntax(mut self, syntax: ProtoSyntax) -> Self {
        self.default_syntax = syntax;
        self
    }
}

/// Proto syntax version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoSyntax {
    /// Proto2 syntax
    Proto2,
    /// Proto3 syntax
    Proto3,
}

impl ProtoSyntax {
    /// Returns the syntax declaration string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtoSyntax::Proto2 => "proto2",
            ProtoSyntax::Proto3 => "proto3",
        }
    }
}

impl TryFrom<&str> for ProtoSyntax {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "proto2" => Ok(ProtoSyntax::Proto2),
            "proto3" => Ok(ProtoSyntax::Proto3),
            _ => Err(Error::UnsupportedSyntax {
                syntax: value.to_string(),
            }),
        }
    }
}

/// A rendered `.proto` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Logical file name, see [`logical_name`]
    pub name: String,
    /// The `.proto` source text
    pub content: String,
}

/// Renders `FileDescriptorProto`s as `.proto` source.
///
/// Rendering is pure: the descriptor is only borrowed and nothing is cached
/// between calls.
#[derive(Debug, Clone, Default)]
pub struct ProtoRenderer {
    config: RendererConfig,
}

impl ProtoRenderer {
    /// Creates a renderer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with a custom configuration
    pub fn with_config(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Render one file descriptor.
    ///
    /// Fails on descriptors that break structural assumptions, such as a
    /// oneof index with no matching declaration or a map entry lacking its
    /// `key`/`value` field.
    pub fn render(&self, file: &FileDescriptorProto) -> Result<RenderedFile> {
        let syntax = match file.syntax.as_deref() {
            None | Some("") => self.config.default_syntax,
            Some(declared) => ProtoSyntax::try_from(declared)?,
        };

        let writer = FileRenderer {
            indent_str: &self.config.indent_str,
            file_name: file.name(),
            package: file.package(),
            syntax,
        };

        Ok(RenderedFile {
            name: logical_name(file.name()),
            content: writer.render_file(file)?,
        })
    }
}

/// Per-message view assembled before the message text is emitted
#[derive(Default)]
struct MessageContext<'a> {
    fields: Vec<String>,
    oneofs: Vec<(&'a str, Vec<String>)>,
    nested_messages: Vec<String>,
    nested_enums: Vec<String>,
}

impl<'a> MessageContext<'a> {
    fn push_oneof_field(&mut self, group: &'a str, rendered: String) {
        match self.oneofs.iter_mut().find(|(name, _)| *name == group) {
            Some((_, fields)) => fields.push(rendered),
            None => self.oneofs.push((group, vec![rendered])),
        }
    }
}

/// State shared by everything rendered from one file
struct FileRenderer<'a> {
    indent_str: &'a str,
    file_name: &'a str,
    package: &'a str,
    syntax: ProtoSyntax,
}

impl<'a> FileRenderer<'a> {
    fn pad(&self, depth: usize) -> String {
        self.indent_str.repeat(depth)
    }

    fn render_file(&self, file: &FileDescriptorProto) -> Result<String> {
        let mut sections = Vec::new();

        sections.push(format!("syntax = \"{}\";\n", self.syntax.as_str()));

        if !self.package.is_empty() {
            sections.push(format!("package {};\n", self.package));
        }

        let imports = self.render_imports(file);
        if !imports.is_empty() {
            sections.push(imports);
        }

        let options = self.render_file_options(file);
        if !options.is_empty() {
            sections.push(options);
        }

        for service in &file.service {
            sections.push(self.render_service(service));
        }

        for message in &file.message_type {
            if is_map_entry(message) {
                continue;
            }
            sections.push(self.render_message(message, 0)?);
        }

        for enum_type in &file.enum_type {
            sections.push(self.render_enum(enum_type, 0));
        }

        for extend in self.render_extensions(&file.extension, 0)? {
            sections.push(extend);
        }

        Ok(sections.join("\n"))
    }

    fn render_imports(&self, file: &FileDescriptorProto) -> String {
        let public_deps: HashSet<usize> = file
            .public_dependency
            .iter()
            .filter_map(|&i| usize::try_from(i).ok())
            .collect();
        let weak_deps: HashSet<usize> = file
            .weak_dependency
            .iter()
            .filter_map(|&i| usize::try_from(i).ok())
            .collect();

        let mut out = String::new();
        for (i, dep) in file.dependency.iter().enumerate() {
            let modifier = if public_deps.contains(&i) {
                "public "
            } else if weak_deps.contains(&i) {
                "weak "
            } else {
                ""
            };
            out.push_str(&format!("import {}\"{}\";\n", modifier, dep));
        }
        out
    }

    fn render_file_options(&self, file: &FileDescriptorProto) -> String {
        let Some(opts) = &file.options else {
            return String::new();
        };

        let mut out = String::new();

        macro_rules! string_option {
            ($name:expr, $value:expr) => {
                if let Some(v) = $value {
                    if !v.is_empty() {
                        out.push_str(&format!("option {} = \"{}\";\n", $name, escape_string(v)));
                    }
                }
            };
        }

        macro_rules! bool_option {
            ($name:expr, $value:expr) => {
                if let Some(v) = $value {
                    out.push_str(&format!("option {} = {};\n", $name, v));
                }
            };
        }

        string_option!("java_package", opts.java_package.as_ref());
        string_option!("java_outer_classname", opts.java_outer_classname.as_ref());
        bool_option!("java_multiple_files", opts.java_multiple_files);
        bool_option!("java_string_check_utf8", opts.java_string_check_utf8);
        if opts.optimize_for.is_some() {
            out.push_str(&format!(
                "option optimize_for = {};\n",
                opts.optimize_for().as_str_name()
            ));
        }
        string_option!("go_package", opts.go_package.as_ref());
        bool_option!("cc_enable_arenas", opts.cc_enable_arenas);
        bool_option!("deprecated", opts.deprecated);
        string_option!("objc_class_prefix", opts.objc_class_prefix.as_ref());
        string_option!("csharp_namespace", opts.csharp_namespace.as_ref());
        string_option!("swift_prefix", opts.swift_prefix.as_ref());
        string_option!("php_class_prefix", opts.php_class_prefix.as_ref());
        string_option!("php_namespace", opts.php_namespace.as_ref());
        string_option!("php_metadata_namespace", opts.php_metadata_namespace.as_ref());
        string_option!("ruby_package", opts.ruby_package.as_ref());

        out
    }

    fn render_service(&self, service: &ServiceDescriptorProto) -> String {
        let mut out = format!("service {} {{\n", service.name());

        if service
            .options
            .as_ref()
            .and_then(|o| o.deprecated)
            .unwrap_or(false)
        {
            out.push_str(&format!("{}option deprecated = true;\n", self.pad(1)));
        }

        for method in &service.method {
            out.push_str(&self.render_method(method));
        }

        out.push_str("}\n");
        out
    }

    fn render_method(&self, method: &MethodDescriptorProto) -> String {
        let input = resolve_type_name(self.package, method.input_type());
        let output = resolve_type_name(self.package, method.output_type());

        let input = if method.client_streaming() {
            format!("stream {}", input)
        } else {
            input
        };
        let output = if method.server_streaming() {
            format!("stream {}", output)
        } else {
            output
        };

        let mut options = Vec::new();
        if let Some(opts) = &method.options {
            if opts.deprecated.unwrap_or(false) {
                options.push("option deprecated = true;".to_string());
            }
            if opts.idempotency_level.is_some() {
                use prost_types::method_options::IdempotencyLevel;
                let level = opts.idempotency_level();
                if level != IdempotencyLevel::IdempotencyUnknown {
                    options.push(format!("option idempotency_level = {};", level.as_str_name()));
                }
            }
        }

        let pad = self.pad(1);
        let signature = format!("rpc {}({}) returns ({})", method.name(), input, output);
        if options.is_empty() {
            return format!("{pad}{signature};\n");
        }

        let mut out = format!("{pad}{signature} {{\n");
        for option in options {
            out.push_str(&format!("{}{}\n", self.pad(2), option));
        }
        out.push_str(&format!("{pad}}}\n"));
        out
    }

    fn render_message(&self, message: &DescriptorProto, depth: usize) -> Result<String> {
        // Map entries of this message, keyed by local name
        let map_entries: HashMap<&str, &DescriptorProto> = message
            .nested_type
            .iter()
            .filter(|nested| is_map_entry(nested))
            .map(|nested| (nested.name(), nested))
            .collect();

        let mut ctx = MessageContext::default();

        for field in &message.field {
            let oneof = self.real_oneof(field, message)?;

            let rendered = match map_entries.get(local_name(field.type_name())) {
                Some(entry) if field.r#type() == Type::Message => {
                    self.render_map_field(field, entry, message)?
                }
                _ => self.render_field(field, oneof.is_some())?,
            };

            match oneof {
                Some(group) => ctx.push_oneof_field(group, rendered),
                None => ctx.fields.push(rendered),
            }
        }

        for nested in &message.nested_type {
            if !is_map_entry(nested) {
                ctx.nested_messages.push(self.render_message(nested, depth + 1)?);
            }
        }

        for enum_type in &message.enum_type {
            ctx.nested_enums.push(self.render_enum(enum_type, depth + 1));
        }

        let nested_extensions = self.render_extensions(&message.extension, depth + 1)?;

        let pad = self.pad(depth);
        let inner = self.pad(depth + 1);
        let mut out = format!("{pad}message {} {{\n", message.name());

        for line in message_reserved(self.file_name, message)? {
            out.push_str(&format!("{inner}{line}\n"));
        }

        for field in &ctx.fields {
            out.push_str(&format!("{inner}{field}\n"));
        }

        for (group, fields) in &ctx.oneofs {
            out.push_str(&format!("{inner}oneof {group} {{\n"));
            let field_pad = self.pad(depth + 2);
            for field in fields {
                out.push_str(&format!("{field_pad}{field}\n"));
            }
            out.push_str(&format!("{inner}}}\n"));
        }

        for range in &message.extension_range {
            out.push_str(&format!(
                "{inner}extensions {} to {};\n",
                range.start(),
                exclusive_end(self.file_name, range.start(), range.end())?
            ));
        }

        for block in ctx
            .nested_messages
            .iter()
            .chain(&ctx.nested_enums)
            .chain(&nested_extensions)
        {
            out.push('\n');
            out.push_str(block);
        }

        out.push_str(&format!("{pad}}}\n"));
        Ok(out)
    }

    /// Name of the oneof group this field really belongs to.
    ///
    /// Proto3 `optional` fields point at a synthetic oneof and are treated as
    /// plain fields.
    fn real_oneof<'m>(
        &self,
        field: &FieldDescriptorProto,
        message: &'m DescriptorProto,
    ) -> Result<Option<&'m str>> {
        let Some(index) = field.oneof_index else {
            return Ok(None);
        };

        let decl = usize::try_from(index)
            .ok()
            .and_then(|i| message.oneof_decl.get(i))
            .ok_or_else(|| {
                Error::render(
                    self.file_name,
                    format!(
                        "field '{}' of message '{}' references oneof index {} but only {} oneof(s) are declared",
                        field.name(),
                        message.name(),
                        index,
                        message.oneof_decl.len()
                    ),
                )
            })?;

        if field.proto3_optional() {
            return Ok(None);
        }
        Ok(Some(decl.name()))
    }

    fn render_map_field(
        &self,
        field: &FieldDescriptorProto,
        entry: &DescriptorProto,
        message: &DescriptorProto,
    ) -> Result<String> {
        let entry_field = |name: &str| {
            entry.field.iter().find(|f| f.name() == name).ok_or_else(|| {
                Error::render(
                    self.file_name,
                    format!(
                        "map entry '{}' of message '{}' has no '{}' field",
                        entry.name(),
                        message.name(),
                        name
                    ),
                )
            })
        };

        let key = self.field_type(entry_field("key")?)?;
        let value = self.field_type(entry_field("value")?)?;

        Ok(format!(
            "map<{}, {}> {} = {}{};",
            key,
            value,
            field.name(),
            field.number(),
            self.field_options(field)
        ))
    }

    fn render_field(&self, field: &FieldDescriptorProto, in_oneof: bool) -> Result<String> {
        let label = self.field_label(field, in_oneof);
        let prefix = if label.is_empty() {
            String::new()
        } else {
            format!("{} ", label)
        };

        Ok(format!(
            "{}{} {} = {}{};",
            prefix,
            self.field_type(field)?,
            field.name(),
            field.number(),
            self.field_options(field)
        ))
    }

    fn field_label(&self, field: &FieldDescriptorProto, in_oneof: bool) -> &'static str {
        if in_oneof {
            return "";
        }

        match field.label() {
            Label::Repeated => "repeated",
            Label::Required => "required",
            Label::Optional => match self.syntax {
                ProtoSyntax::Proto2 => "optional",
                ProtoSyntax::Proto3 if field.proto3_optional() => "optional",
                ProtoSyntax::Proto3 => "",
            },
        }
    }

    fn field_type(&self, field: &FieldDescriptorProto) -> Result<String> {
        if !field.type_name().is_empty() {
            return Ok(resolve_type_name(self.package, field.type_name()));
        }

        let scalar = match field.r#type() {
            Type::Double => "double",
            Type::Float => "float",
            Type::Int64 => "int64",
            Type::Uint64 => "uint64",
            Type::Int32 => "int32",
            Type::Fixed64 => "fixed64",
            Type::Fixed32 => "fixed32",
            Type::Bool => "bool",
            Type::String => "string",
            Type::Bytes => "bytes",
            Type::Uint32 => "uint32",
            Type::Sfixed32 => "sfixed32",
            Type::Sfixed64 => "sfixed64",
            Type::Sint32 => "sint32",
            Type::Sint64 => "sint64",
            Type::Message | Type::Enum | Type::Group => {
                return Err(Error::render(
                    self.file_name,
                    format!("field '{}' has a named type but no type_name", field.name()),
                ));
            }
        };
        Ok(scalar.to_string())
    }

    fn field_options(&self, field: &FieldDescriptorProto) -> String {
        let mut options = Vec::new();

        // Default value (proto2 only)
        if self.syntax == ProtoSyntax::Proto2 {
            if let Some(default) = &field.default_value {
                let formatted = match field.r#type() {
                    Type::String => format!("\"{}\"", escape_string(default)),
                    // Bytes defaults are already C-escaped in the descriptor
                    Type::Bytes => format!("\"{}\"", default),
                    _ => default.clone(),
                };
                options.push(format!("default = {}", formatted));
            }
        }

        if let Some(json_name) = &field.json_name {
            if json_name != &to_lower_camel_case(field.name()) {
                options.push(format!("json_name = \"{}\"", escape_string(json_name)));
            }
        }

        if let Some(opts) = &field.options {
            if let Some(packed) = opts.packed {
                options.push(format!("packed = {}", packed));
            }
            if opts.deprecated.unwrap_or(false) {
                options.push("deprecated = true".to_string());
            }
        }

        if options.is_empty() {
            String::new()
        } else {
            format!(" [{}]", options.join(", "))
        }
    }

    fn render_enum(&self, enum_type: &EnumDescriptorProto, depth: usize) -> String {
        let pad = self.pad(depth);
        let inner = self.pad(depth + 1);
        let mut out = format!("{pad}enum {} {{\n", enum_type.name());

        if enum_type
            .options
            .as_ref()
            .and_then(|o| o.allow_alias)
            .unwrap_or(false)
        {
            out.push_str(&format!("{inner}option allow_alias = true;\n"));
        }

        // Enum reserved ranges are inclusive
        if !enum_type.reserved_range.is_empty() {
            let ranges: Vec<String> = enum_type
                .reserved_range
                .iter()
                .map(|range| {
                    if range.start() == range.end() {
                        range.start().to_string()
                    } else if range.end() == i32::MAX {
                        format!("{} to max", range.start())
                    } else {
                        format!("{} to {}", range.start(), range.end())
                    }
                })
                .collect();
            out.push_str(&format!("{inner}reserved {};\n", ranges.join(", ")));
        }

        if !enum_type.reserved_name.is_empty() {
            out.push_str(&format!(
                "{inner}reserved {};\n",
                quoted_list(&enum_type.reserved_name)
            ));
        }

        for value in &enum_type.value {
            let deprecated = value
                .options
                .as_ref()
                .and_then(|o| o.deprecated)
                .unwrap_or(false);
            let suffix = if deprecated { " [deprecated = true]" } else { "" };
            out.push_str(&format!(
                "{inner}{} = {}{};\n",
                value.name(),
                value.number(),
                suffix
            ));
        }

        out.push_str(&format!("{pad}}}\n"));
        out
    }

    /// Renders `extend` blocks, one per extendee in first-seen order
    fn render_extensions(
        &self,
        extensions: &[FieldDescriptorProto],
        depth: usize,
    ) -> Result<Vec<String>> {
        let mut groups: Vec<(&str, Vec<&FieldDescriptorProto>)> = Vec::new();
        for extension in extensions {
            match groups.iter_mut().find(|(e, _)| *e == extension.extendee()) {
                Some((_, fields)) => fields.push(extension),
                None => groups.push((extension.extendee(), vec![extension])),
            }
        }

        let pad = self.pad(depth);
        let inner = self.pad(depth + 1);
        groups
            .into_iter()
            .map(|(extendee, fields)| -> Result<String> {
                let mut out = format!(
                    "{pad}extend {} {{\n",
                    resolve_type_name(self.package, extendee)
                );
                for field in fields {
                    out.push_str(&format!("{inner}{}\n", self.render_field(field, false)?));
                }
                out.push_str(&format!("{pad}}}\n"));
                Ok(out)
            })
            .collect()
    }
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message
        .options
        .as_ref()
        .and_then(|o| o.map_entry)
        .unwrap_or(false)
}

/// Message reserved and extension ranges use an exclusive end, which must
/// lie past the start
fn exclusive_end(file: &str, start: i32, end: i32) -> Result<String> {
    if end <= start {
        return Err(Error::render(
            file,
            format!("range {start}..{end} has its end before its start"),
        ));
    }
    if end == MAX_FIELD_NUMBER as i32 + 1 {
        Ok("max".to_string())
    } else {
        Ok((end - 1).to_string())
    }
}

fn message_reserved(file: &str, message: &DescriptorProto) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    if !message.reserved_range.is_empty() {
        let ranges = message
            .reserved_range
            .iter()
            .map(|range| {
                let last = exclusive_end(file, range.start(), range.end())?;
                if last == range.start().to_string() {
                    Ok(last)
                } else {
                    Ok(format!("{} to {}", range.start(), last))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        lines.push(format!("reserved {};", ranges.join(", ")));
    }

    if !message.reserved_name.is_empty() {
        lines.push(format!("reserved {};", quoted_list(&message.reserved_name)));
    }

    Ok(lines)
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("\"{}\"", escape_string(name)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prost_types::{EnumValueDescriptorProto, MessageOptions, OneofDescriptorProto};

    fn field(name: &str, number: i32, label: Label, ty: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(label as i32),
            r#type: Some(ty as i32),
            ..Default::default()
        }
    }

    fn typed(mut f: FieldDescriptorProto, type_name: &str) -> FieldDescriptorProto {
        f.type_name = Some(type_name.to_string());
        f
    }

    fn in_oneof(mut f: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
        f.oneof_index = Some(index);
        f
    }

    fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            field: fields,
            ..Default::default()
        }
    }

    fn map_entry(name: &str, key: Type, value: FieldDescriptorProto) -> DescriptorProto {
        let mut value = value;
        value.name = Some("value".to_string());
        value.number = Some(2);
        DescriptorProto {
            name: Some(name.to_string()),
            field: vec![field("key", 1, Label::Optional, key), value],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn file(package: &str, messages: Vec<DescriptorProto>) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("pkg/v1/test.proto".to_string()),
            package: Some(package.to_string()),
            message_type: messages,
            ..Default::default()
        }
    }

    fn render(file: &FileDescriptorProto) -> String {
        ProtoRenderer::new().render(file).unwrap().content
    }

    #[test]
    fn test_proto_syntax() {
        assert_eq!(ProtoSyntax::try_from("proto2").unwrap(), ProtoSyntax::Proto2);
        assert_eq!(ProtoSyntax::try_from("proto3").unwrap(), ProtoSyntax::Proto3);
        assert!(ProtoSyntax::try_from("proto4").is_err());
    }

    #[test]
    fn test_simple_proto2_message() {
        let desc = file(
            "pkg.v1",
            vec![message(
                "M",
                vec![
                    field("id", 1, Label::Required, Type::Int32),
                    field("name", 2, Label::Optional, Type::String),
                ],
            )],
        );

        let expected = "\
syntax = \"proto2\";

package pkg.v1;

message M {
  required int32 id = 1;
  optional string name = 2;
}
";
        assert_eq!(render(&desc), expected);
    }

    #[test]
    fn test_rendered_name_is_logical() {
        let mut desc = file("pkg.v1", vec![]);
        desc.name = Some("/pkg//v1/test.proto".to_string());
        let rendered = ProtoRenderer::new().render(&desc).unwrap();
        assert_eq!(rendered.name, "pkg/v1/test.proto");
    }

    #[test]
    fn test_default_syntax_applies_only_when_absent() {
        let renderer =
            ProtoRenderer::with_config(RendererConfig::new().default_syntax(ProtoSyntax::Proto3));

        let desc = file("", vec![]);
        assert!(renderer.render(&desc).unwrap().content.starts_with("syntax = \"proto3\";"));

        let mut desc = file("", vec![]);
        desc.syntax = Some("proto2".to_string());
        assert!(renderer.render(&desc).unwrap().content.starts_with("syntax = \"proto2\";"));
    }

    #[test]
    fn test_unknown_syntax_is_rejected() {
        let mut desc = file("", vec![]);
        desc.syntax = Some("editions".to_string());
        let err = ProtoRenderer::new().render(&desc).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSyntax { .. }));
    }

    #[test]
    fn test_proto3_labels() {
        let mut optional = field("nick", 3, Label::Optional, Type::String);
        optional.proto3_optional = Some(true);
        optional.oneof_index = Some(0);

        let mut msg = message(
            "User",
            vec![
                field("id", 1, Label::Optional, Type::Int64),
                field("tags", 2, Label::Repeated, Type::String),
                optional,
            ],
        );
        msg.oneof_decl = vec![OneofDescriptorProto {
            name: Some("_nick".to_string()),
            ..Default::default()
        }];

        let mut desc = file("pkg.v1", vec![msg]);
        desc.syntax = Some("proto3".to_string());
        let text = render(&desc);

        assert!(text.contains("  int64 id = 1;\n"));
        assert!(text.contains("  repeated string tags = 2;\n"));
        assert!(text.contains("  optional string nick = 3;\n"));
        assert!(!text.contains("oneof"));
    }

    #[test]
    fn test_map_field_synthesis() {
        let mut msg = message(
            "Counter",
            vec![typed(
                field("counts", 1, Label::Repeated, Type::Message),
                ".pkg.v1.Counter.CountsEntry",
            )],
        );
        msg.nested_type = vec![map_entry(
            "CountsEntry",
            Type::String,
            field("value", 2, Label::Optional, Type::Int32),
        )];

        let text = render(&file("pkg.v1", vec![msg]));

        assert!(text.contains("  map<string, int32> counts = 1;\n"));
        assert!(!text.contains("repeated"));
        assert!(!text.contains("CountsEntry"));
    }

    #[test]
    fn test_map_value_uses_type_name_rule() {
        let mut msg = message(
            "Index",
            vec![typed(
                field("items", 4, Label::Repeated, Type::Message),
                ".pkg.v1.Index.ItemsEntry",
            )],
        );
        msg.nested_type = vec![map_entry(
            "ItemsEntry",
            Type::Int64,
            typed(field("value", 2, Label::Optional, Type::Message), ".other.Item"),
        )];

        let text = render(&file("pkg.v1", vec![msg]));
        assert!(text.contains("  map<int64, other.Item> items = 4;\n"));
    }

    #[test]
    fn test_map_entry_without_value_is_an_error() {
        let mut entry = map_entry(
            "BrokenEntry",
            Type::String,
            field("value", 2, Label::Optional, Type::Int32),
        );
        entry.field.truncate(1);

        let mut msg = message(
            "Broken",
            vec![typed(
                field("broken", 1, Label::Repeated, Type::Message),
                ".pkg.v1.Broken.BrokenEntry",
            )],
        );
        msg.nested_type = vec![entry];

        let err = ProtoRenderer::new()
            .render(&file("pkg.v1", vec![msg]))
            .unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
        assert!(err.to_string().contains("BrokenEntry"));
    }

    #[test]
    fn test_oneof_grouping() {
        let mut msg = message(
            "Shape",
            vec![
                field("id", 1, Label::Optional, Type::Int32),
                in_oneof(field("circle", 2, Label::Optional, Type::Double), 0),
                field("label", 3, Label::Optional, Type::String),
                in_oneof(field("square", 4, Label::Optional, Type::Double), 0),
            ],
        );
        msg.oneof_decl = vec![OneofDescriptorProto {
            name: Some("kind".to_string()),
            ..Default::default()
        }];

        let expected = "\
message Shape {
  optional int32 id = 1;
  optional string label = 3;
  oneof kind {
    double circle = 2;
    double square = 4;
  }
}
";
        let text = render(&file("pkg.v1", vec![msg]));
        assert!(text.ends_with(expected), "{}", text);
    }

    #[test]
    fn test_oneof_index_out_of_range() {
        let msg = message(
            "Bad",
            vec![in_oneof(field("x", 1, Label::Optional, Type::Int32), 3)],
        );
        let err = ProtoRenderer::new()
            .render(&file("pkg.v1", vec![msg]))
            .unwrap_err();
        match err {
            Error::Render { file, details } => {
                assert_eq!(file, "pkg/v1/test.proto");
                assert!(details.contains("oneof index 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scope_relative_naming() {
        let msg = message(
            "Holder",
            vec![typed(
                field("other", 1, Label::Optional, Type::Message),
                ".pkg.v1.Other",
            )],
        );

        let same = render(&file("pkg.v1", vec![msg.clone()]));
        assert!(same.contains("  optional Other other = 1;\n"));

        let different = render(&file("pkg.v2", vec![msg]));
        assert!(different.contains("  optional pkg.v1.Other other = 1;\n"));
    }

    #[test]
    fn test_import_qualifiers() {
        let mut desc = file("pkg.v1", vec![]);
        desc.dependency = vec![
            "a.proto".to_string(),
            "b.proto".to_string(),
            "c.proto".to_string(),
        ];
        desc.public_dependency = vec![1];
        desc.weak_dependency = vec![2];

        let text = render(&desc);
        assert!(text.contains(
            "import \"a.proto\";\nimport public \"b.proto\";\nimport weak \"c.proto\";\n"
        ));
    }

    #[test]
    fn test_service_rendering() {
        let service = ServiceDescriptorProto {
            name: Some("Greeter".to_string()),
            method: vec![
                MethodDescriptorProto {
                    name: Some("Hello".to_string()),
                    input_type: Some(".pkg.v1.HelloRequest".to_string()),
                    output_type: Some(".google.protobuf.Empty".to_string()),
                    ..Default::default()
                },
                MethodDescriptorProto {
                    name: Some("Chat".to_string()),
                    input_type: Some(".pkg.v1.Msg".to_string()),
                    output_type: Some(".pkg.v1.Msg".to_string()),
                    client_streaming: Some(true),
                    server_streaming: Some(true),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let mut desc = file("pkg.v1", vec![]);
        desc.service = vec![service];

        let expected = "\
service Greeter {
  rpc Hello(HelloRequest) returns (google.protobuf.Empty);
  rpc Chat(stream Msg) returns (stream Msg);
}
";
        assert!(render(&desc).ends_with(expected));
    }

    #[test]
    fn test_declaration_order() {
        let mut desc = file("pkg.v1", vec![message("Msg", vec![])]);
        desc.enum_type = vec![EnumDescriptorProto {
            name: Some("Status".to_string()),
            value: vec![EnumValueDescriptorProto {
                name: Some("OK".to_string()),
                number: Some(0),
                ..Default::default()
            }],
            ..Default::default()
        }];
        desc.service = vec![ServiceDescriptorProto {
            name: Some("Svc".to_string()),
            ..Default::default()
        }];

        let text = render(&desc);
        let service = text.find("service Svc").unwrap();
        let msg = text.find("message Msg").unwrap();
        let status = text.find("enum Status").unwrap();
        assert!(service < msg && msg < status);
    }

    #[test]
    fn test_nested_types() {
        let mut outer = message(
            "Outer",
            vec![typed(
                field("inner", 1, Label::Optional, Type::Message),
                ".pkg.v1.Outer.Inner",
            )],
        );
        outer.nested_type = vec![message(
            "Inner",
            vec![typed(
                field("kind", 1, Label::Optional, Type::Enum),
                ".pkg.v1.Outer.Kind",
            )],
        )];
        outer.enum_type = vec![EnumDescriptorProto {
            name: Some("Kind".to_string()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("A".to_string()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("B".to_string()),
                    number: Some(1),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }];

        let expected = "\
message Outer {
  optional Outer.Inner inner = 1;

  message Inner {
    optional Outer.Kind kind = 1;
  }

  enum Kind {
    A = 0;
    B = 1;
  }
}
";
        assert!(render(&file("pkg.v1", vec![outer])).ends_with(expected));
    }

    #[test]
    fn test_reserved_and_field_options() {
        use prost_types::descriptor_proto::ReservedRange;
        use prost_types::FieldOptions;

        let mut count = field("count", 1, Label::Optional, Type::Int32);
        count.default_value = Some("7".to_string());
        count.json_name = Some("count".to_string());

        let mut ids = field("old_ids", 2, Label::Repeated, Type::Int32);
        ids.json_name = Some("legacyIds".to_string());
        ids.options = Some(FieldOptions {
            packed: Some(true),
            deprecated: Some(true),
            ..Default::default()
        });

        let mut msg = message("Opts", vec![count, ids]);
        msg.reserved_range = vec![
            ReservedRange {
                start: Some(5),
                end: Some(6),
            },
            ReservedRange {
                start: Some(8),
                end: Some(11),
            },
        ];
        msg.reserved_name = vec!["gone".to_string()];

        let text = render(&file("pkg.v1", vec![msg]));
        assert!(text.contains("  reserved 5, 8 to 10;\n  reserved \"gone\";\n"));
        assert!(text.contains("  optional int32 count = 1 [default = 7];\n"));
        assert!(text.contains(
            "  repeated int32 old_ids = 2 [json_name = \"legacyIds\", packed = true, deprecated = true];\n"
        ));
    }

    #[test]
    fn test_inverted_reserved_range_is_an_error() {
        use prost_types::descriptor_proto::{ExtensionRange, ReservedRange};

        let mut msg = message("Bad", vec![]);
        msg.reserved_range = vec![ReservedRange {
            start: Some(1),
            end: Some(i32::MIN),
        }];
        let err = ProtoRenderer::new()
            .render(&file("pkg.v1", vec![msg]))
            .unwrap_err();
        match err {
            Error::Render { file, details } => {
                assert_eq!(file, "pkg/v1/test.proto");
                assert!(details.contains("range 1.."));
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut msg = message("Bad", vec![]);
        msg.extension_range = vec![ExtensionRange {
            start: Some(100),
            end: Some(100),
            ..Default::default()
        }];
        let err = ProtoRenderer::new()
            .render(&file("pkg.v1", vec![msg]))
            .unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }

    #[test]
    fn test_extensions() {
        let mut ext = field("tag", 100, Label::Optional, Type::String);
        ext.extendee = Some(".pkg.v1.Base".to_string());

        let mut desc = file("pkg.v1", vec![]);
        desc.extension = vec![ext];

        assert!(render(&desc).ends_with("extend Base {\n  optional string tag = 100;\n}\n"));
    }

    #[test]
    fn test_file_options_follow_imports() {
        use prost_types::FileOptions;

        let mut desc = file("pkg.v1", vec![]);
        desc.dependency = vec!["dep.proto".to_string()];
        desc.options = Some(FileOptions {
            go_package: Some("example.com/pkg/v1;pkgv1".to_string()),
            java_multiple_files: Some(true),
            ..Default::default()
        });

        let text = render(&desc);
        assert!(text.contains(
            "import \"dep.proto\";\n\noption java_multiple_files = true;\noption go_package = \"example.com/pkg/v1;pkgv1\";\n"
        ));
    }
}
