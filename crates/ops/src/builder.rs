//! Pure assembly of kubectl argument vectors from validated arguments.
//!
//! Token order is fixed per operation: subcommand, resource kind, positional
//! identifiers, then flags in declared order. Nothing here performs I/O.

use std::fmt;

use kmcp_core::{ArgumentSet, KmcpError, KmcpResult, ParamSpec};

/// One kubectl invocation, without the program name or global flags.
///
/// Empty tokens are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandVector(Vec<String>);

impl CommandVector {
    pub fn new(subcommand: &str) -> Self {
        let mut v = Self(Vec::with_capacity(8));
        v.push(subcommand);
        v
    }

    pub fn push(&mut self, token: impl Into<String>) {
        let token = token.into();
        if !token.is_empty() {
            self.0.push(token);
        }
    }

    /// `name value`, only when the value is present and non-empty.
    pub fn opt(&mut self, name: &str, value: Option<&str>) {
        if let Some(v) = value.filter(|s| !s.is_empty()) {
            self.push(name);
            self.push(v);
        }
    }

    fn opt_positional(&mut self, value: Option<&str>) {
        if let Some(v) = value {
            self.push(v);
        }
    }

    pub fn flag(&mut self, name: &str, on: bool) {
        if on {
            self.push(name);
        }
    }

    /// `name N`, only when N is strictly positive.
    pub fn positive(&mut self, name: &str, value: Option<i64>) {
        if let Some(n) = value.filter(|n| *n > 0) {
            self.push(name);
            self.push(n.to_string());
        }
    }

    pub fn subcommand(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn tokens(&self) -> &[String] { &self.0 }

    pub fn joined(&self) -> String { self.0.join(" ") }
}

impl fmt::Display for CommandVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// The kubectl-backed operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandOp {
    Get,
    Describe,
    Logs,
    Create,
    Delete,
    Apply,
    Label,
    Annotate,
}

impl CommandOp {
    pub const ALL: [CommandOp; 8] = [
        CommandOp::Get,
        CommandOp::Describe,
        CommandOp::Logs,
        CommandOp::Create,
        CommandOp::Delete,
        CommandOp::Apply,
        CommandOp::Label,
        CommandOp::Annotate,
    ];

    pub fn subcommand(self) -> &'static str {
        match self {
            CommandOp::Get => "get",
            CommandOp::Describe => "describe",
            CommandOp::Logs => "logs",
            CommandOp::Create => "create",
            CommandOp::Delete => "delete",
            CommandOp::Apply => "apply",
            CommandOp::Label => "label",
            CommandOp::Annotate => "annotate",
        }
    }

    /// Registered operation name.
    pub fn tool_name(self) -> String { format!("kubectl_{}", self.subcommand()) }

    /// Only get and apply re-indent JSON output.
    pub fn reindents_json(self) -> bool { matches!(self, CommandOp::Get | CommandOp::Apply) }

    pub fn description(self) -> &'static str {
        match self {
            CommandOp::Get => "Get Kubernetes resources using kubectl get",
            CommandOp::Describe => "Show details of a specific resource using kubectl describe",
            CommandOp::Logs => "Print the logs for a container in a pod using kubectl logs",
            CommandOp::Create => "Create a resource from a file or from stdin using kubectl create",
            CommandOp::Delete => "Delete resources by filenames, stdin, resources and names, or by resources and label selector",
            CommandOp::Apply => "Apply a configuration to a resource by filename using kubectl apply",
            CommandOp::Label => "Update the labels on a resource using kubectl label",
            CommandOp::Annotate => "Update the annotations on a resource using kubectl annotate",
        }
    }

    /// Declared parameters, in schema order.
    pub fn params(self) -> Vec<ParamSpec> {
        use ParamSpec as P;
        match self {
            CommandOp::Get => vec![
                P::string("resource", "Resource type to get (e.g. pods, deployments, services)").required(),
                P::string("name", "Name of the resource to get"),
                P::string("namespace", "Namespace to query"),
                P::string("field_selector", "Selector to filter resources by field"),
                P::string("label_selector", "Selector to filter resources by label"),
                P::string("output", "Output format (json, yaml, wide, name, custom-columns, jsonpath)").with_default("json"),
                P::bool("all_namespaces", "List resources across all namespaces").with_default(false),
                P::bool("show_labels", "Show all labels as the last column").with_default(false),
                P::string("sort_by", "Sort list by the given JSONPath expression"),
                P::string("custom_columns", "Column spec, required when output is custom-columns"),
                P::string("jsonpath", "JSONPath template, required when output is jsonpath"),
            ],
            CommandOp::Describe => vec![
                P::string("resource", "Resource type to describe").required(),
                P::string("name", "Name of the resource to describe").required(),
                P::string("namespace", "Namespace of the resource"),
            ],
            CommandOp::Logs => vec![
                P::string("pod_name", "Name of the pod").required(),
                P::string("namespace", "Namespace of the pod").with_default("default"),
                P::string("container", "Container name, for multi-container pods"),
                P::bool("follow", "Stream the logs").with_default(false),
                P::bool("previous", "Logs of the previous container instance").with_default(false),
                P::number("tail", "Number of recent lines to display"),
                P::string("since", "Only logs newer than a relative duration like 5s, 2m, or 3h"),
                P::string("since_time", "Only logs after an RFC3339 timestamp"),
                P::bool("timestamps", "Include timestamps on each line").with_default(false),
            ],
            CommandOp::Create => vec![
                P::string("filename", "Manifest file to create from"),
                P::string("resource", "Resource type to create (e.g. deployment, namespace)"),
                P::string("name", "Name of the resource"),
                P::string("namespace", "Namespace to create in"),
                P::string("image", "Container image, for deployments"),
                P::bool("dry_run", "Only print the object that would be sent").with_default(false),
                P::string("output", "Output format"),
            ],
            CommandOp::Delete => vec![
                P::string("resource", "Resource type to delete").required(),
                P::string("name", "Name of the resource"),
                P::string("filename", "Manifest file naming the resources to delete"),
                P::string("namespace", "Namespace of the resources"),
                P::string("label_selector", "Delete resources matching this label selector"),
                P::bool("all", "Delete all resources of the type").with_default(false),
                P::bool("force", "Immediately remove resources from the API").with_default(false),
                P::number("grace_period", "Seconds given to the resource to terminate gracefully"),
                P::bool("ignore_not_found", "Treat not found as a successful delete").with_default(false),
            ],
            CommandOp::Apply => vec![
                P::string("filename", "Manifest file or directory to apply").required(),
                P::string("namespace", "Namespace to apply into"),
                P::bool("recursive", "Process the directory recursively").with_default(false),
                P::bool("dry_run", "Only print the object that would be sent").with_default(false),
                P::string("output", "Output format"),
                P::bool("force", "Delete and re-create the resource when needed").with_default(false),
                P::bool("validate", "Validate the input before sending it").with_default(true),
            ],
            CommandOp::Label => vec![
                P::string("resource", "Resource type to label").required(),
                P::string("name", "Name of the resource"),
                P::string("labels", "Labels as key=value pairs, comma separated; key- removes").required(),
                P::string("namespace", "Namespace of the resource"),
                P::string("label_selector", "Label resources matching this selector"),
                P::bool("overwrite", "Overwrite existing labels").with_default(false),
                P::bool("all", "Label all resources of the type").with_default(false),
            ],
            CommandOp::Annotate => vec![
                P::string("resource", "Resource type to annotate").required(),
                P::string("name", "Name of the resource"),
                P::string("annotations", "Annotations as key=value pairs, comma separated; key- removes").required(),
                P::string("namespace", "Namespace of the resource"),
                P::string("label_selector", "Annotate resources matching this selector"),
                P::bool("overwrite", "Overwrite existing annotations").with_default(false),
                P::bool("all", "Annotate all resources of the type").with_default(false),
            ],
        }
    }
}

impl fmt::Display for CommandOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subcommand())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetArgs<'a> {
    pub resource: Option<&'a str>,
    pub name: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub field_selector: Option<&'a str>,
    pub label_selector: Option<&'a str>,
    pub output: Option<&'a str>,
    pub all_namespaces: bool,
    pub show_labels: bool,
    pub sort_by: Option<&'a str>,
    pub custom_columns: Option<&'a str>,
    pub jsonpath: Option<&'a str>,
}

impl<'a> GetArgs<'a> {
    pub fn from_args(a: &'a ArgumentSet) -> Self {
        Self {
            resource: a.str("resource"),
            name: a.str("name"),
            namespace: a.str("namespace"),
            field_selector: a.str("field_selector"),
            label_selector: a.str("label_selector"),
            output: a.str("output"),
            all_namespaces: a.flag("all_namespaces"),
            show_labels: a.flag("show_labels"),
            sort_by: a.str("sort_by"),
            custom_columns: a.str("custom_columns"),
            jsonpath: a.str("jsonpath"),
        }
    }

    pub fn to_command(&self) -> KmcpResult<CommandVector> {
        let mut v = CommandVector::new("get");
        v.push(required(self.resource, "resource")?);
        v.opt_positional(self.name);
        if self.all_namespaces {
            v.push("--all-namespaces");
        } else {
            v.opt("-n", self.namespace);
        }
        v.opt("--field-selector", self.field_selector);
        v.opt("-l", self.label_selector);
        match self.output {
            Some("custom-columns") => {
                let spec = self.custom_columns.ok_or_else(|| {
                    KmcpError::Validation("custom_columns must be specified when output format is 'custom-columns'".into())
                })?;
                v.push("-o");
                v.push(format!("custom-columns={}", spec));
            }
            Some("jsonpath") => {
                let expr = self.jsonpath.ok_or_else(|| {
                    KmcpError::Validation("jsonpath must be specified when output format is 'jsonpath'".into())
                })?;
                v.push("-o");
                v.push(format!("jsonpath={}", expr));
            }
            other => v.opt("-o", other),
        }
        v.flag("--show-labels", self.show_labels);
        v.opt("--sort-by", self.sort_by);
        Ok(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeArgs<'a> {
    pub resource: Option<&'a str>,
    pub name: Option<&'a str>,
    pub namespace: Option<&'a str>,
}

impl<'a> DescribeArgs<'a> {
    pub fn from_args(a: &'a ArgumentSet) -> Self {
        Self { resource: a.str("resource"), name: a.str("name"), namespace: a.str("namespace") }
    }

    pub fn to_command(&self) -> KmcpResult<CommandVector> {
        let mut v = CommandVector::new("describe");
        v.push(required(self.resource, "resource")?);
        v.push(required(self.name, "name")?);
        v.opt("-n", self.namespace);
        Ok(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogsArgs<'a> {
    pub pod_name: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub container: Option<&'a str>,
    pub follow: bool,
    pub previous: bool,
    pub tail: Option<i64>,
    pub since: Option<&'a str>,
    pub since_time: Option<&'a str>,
    pub timestamps: bool,
}

impl<'a> LogsArgs<'a> {
    pub fn from_args(a: &'a ArgumentSet) -> Self {
        Self {
            pod_name: a.str("pod_name"),
            namespace: a.str("namespace"),
            container: a.str("container"),
            follow: a.flag("follow"),
            previous: a.flag("previous"),
            tail: a.number("tail"),
            since: a.str("since"),
            since_time: a.str("since_time"),
            timestamps: a.flag("timestamps"),
        }
    }

    pub fn to_command(&self) -> KmcpResult<CommandVector> {
        let mut v = CommandVector::new("logs");
        v.push(required(self.pod_name, "pod_name")?);
        v.opt("-n", self.namespace);
        v.opt("-c", self.container);
        v.flag("-f", self.follow);
        v.flag("-p", self.previous);
        v.positive("--tail", self.tail);
        v.opt("--since", self.since);
        v.opt("--since-time", self.since_time);
        v.flag("--timestamps", self.timestamps);
        Ok(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateArgs<'a> {
    pub filename: Option<&'a str>,
    pub resource: Option<&'a str>,
    pub name: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub image: Option<&'a str>,
    pub dry_run: bool,
    pub output: Option<&'a str>,
}

impl<'a> CreateArgs<'a> {
    pub fn from_args(a: &'a ArgumentSet) -> Self {
        Self {
            filename: a.str("filename"),
            resource: a.str("resource"),
            name: a.str("name"),
            namespace: a.str("namespace"),
            image: a.str("image"),
            dry_run: a.flag("dry_run"),
            output: a.str("output"),
        }
    }

    pub fn to_command(&self) -> KmcpResult<CommandVector> {
        let mut v = CommandVector::new("create");
        match (self.filename, self.resource) {
            (Some(file), _) => {
                v.push("-f");
                v.push(file);
            }
            (None, Some(resource)) => {
                v.push(resource);
                v.opt_positional(self.name);
                // --image is only meaningful for `create deployment`
                if resource == "deployment" {
                    v.opt("--image", self.image);
                }
            }
            (None, None) => return Err(KmcpError::Validation("either filename or resource must be specified".into())),
        }
        v.opt("-n", self.namespace);
        v.flag("--dry-run=client", self.dry_run);
        v.opt("-o", self.output);
        Ok(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteArgs<'a> {
    pub resource: Option<&'a str>,
    pub name: Option<&'a str>,
    pub filename: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub label_selector: Option<&'a str>,
    pub all: bool,
    pub force: bool,
    pub grace_period: Option<i64>,
    pub ignore_not_found: bool,
}

impl<'a> DeleteArgs<'a> {
    pub fn from_args(a: &'a ArgumentSet) -> Self {
        Self {
            resource: a.str("resource"),
            name: a.str("name"),
            filename: a.str("filename"),
            namespace: a.str("namespace"),
            label_selector: a.str("label_selector"),
            all: a.flag("all"),
            force: a.flag("force"),
            grace_period: a.number("grace_period"),
            ignore_not_found: a.flag("ignore_not_found"),
        }
    }

    pub fn to_command(&self) -> KmcpResult<CommandVector> {
        let mut v = CommandVector::new("delete");
        match self.filename {
            Some(file) => {
                v.push("-f");
                v.push(file);
            }
            None => {
                v.push(required(self.resource, "resource")?);
                v.opt_positional(self.name);
            }
        }
        v.opt("-n", self.namespace);
        v.opt("-l", self.label_selector);
        v.flag("--all", self.all);
        v.flag("--force", self.force);
        v.positive("--grace-period", self.grace_period);
        v.flag("--ignore-not-found", self.ignore_not_found);
        Ok(v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyArgs<'a> {
    pub filename: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub recursive: bool,
    pub dry_run: bool,
    pub output: Option<&'a str>,
    pub force: bool,
    pub validate: bool,
}

impl<'a> ApplyArgs<'a> {
    pub fn from_args(a: &'a ArgumentSet) -> Self {
        Self {
            filename: a.str("filename"),
            namespace: a.str("namespace"),
            recursive: a.flag("recursive"),
            dry_run: a.flag("dry_run"),
            output: a.str("output"),
            force: a.flag("force"),
            // absent means validate
            validate: a.get("validate").and_then(|v| v.as_bool()).unwrap_or(true),
        }
    }

    pub fn to_command(&self) -> KmcpResult<CommandVector> {
        let mut v = CommandVector::new("apply");
        v.push("-f");
        v.push(required(self.filename, "filename")?);
        v.opt("-n", self.namespace);
        v.flag("--recursive", self.recursive);
        v.flag("--dry-run=client", self.dry_run);
        v.opt("-o", self.output);
        v.flag("--force", self.force);
        v.flag("--validate=false", !self.validate);
        Ok(v)
    }
}

/// Shared shape of `label` and `annotate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataArgs<'a> {
    pub resource: Option<&'a str>,
    pub name: Option<&'a str>,
    /// `key=value[,...]` or `key-`.
    pub expression: Option<&'a str>,
    pub namespace: Option<&'a str>,
    pub label_selector: Option<&'a str>,
    pub overwrite: bool,
    pub all: bool,
}

impl<'a> MetadataArgs<'a> {
    pub fn from_args(a: &'a ArgumentSet, expression_key: &str) -> Self {
        Self {
            resource: a.str("resource"),
            name: a.str("name"),
            expression: a.str(expression_key),
            namespace: a.str("namespace"),
            label_selector: a.str("label_selector"),
            overwrite: a.flag("overwrite"),
            all: a.flag("all"),
        }
    }

    pub fn to_command(&self, verb: &str, expression_key: &str) -> KmcpResult<CommandVector> {
        let mut v = CommandVector::new(verb);
        v.push(required(self.resource, "resource")?);
        v.opt_positional(self.name);
        v.push(required(self.expression, expression_key)?);
        v.opt("-n", self.namespace);
        v.opt("-l", self.label_selector);
        v.flag("--overwrite", self.overwrite);
        v.flag("--all", self.all);
        Ok(v)
    }
}

fn required<'a>(value: Option<&'a str>, key: &str) -> KmcpResult<&'a str> {
    value.ok_or_else(|| KmcpError::Validation(format!("{} must be specified", key)))
}

/// Assemble the argument vector for `op`.
pub fn build(op: CommandOp, args: &ArgumentSet) -> KmcpResult<CommandVector> {
    match op {
        CommandOp::Get => GetArgs::from_args(args).to_command(),
        CommandOp::Describe => DescribeArgs::from_args(args).to_command(),
        CommandOp::Logs => LogsArgs::from_args(args).to_command(),
        CommandOp::Create => CreateArgs::from_args(args).to_command(),
        CommandOp::Delete => DeleteArgs::from_args(args).to_command(),
        CommandOp::Apply => ApplyArgs::from_args(args).to_command(),
        CommandOp::Label => MetadataArgs::from_args(args, "labels").to_command("label", "labels"),
        CommandOp::Annotate => MetadataArgs::from_args(args, "annotations").to_command("annotate", "annotations"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_drops_empty_tokens() {
        let mut v = CommandVector::new("get");
        v.push("");
        v.opt("-n", Some(""));
        v.opt("-l", None);
        v.positive("--tail", Some(0));
        v.positive("--tail", Some(-3));
        assert_eq!(v.tokens(), &["get".to_string()]);
        assert_eq!(v.subcommand(), "get");
    }

    #[test]
    fn tool_names_and_reindent() {
        assert_eq!(CommandOp::Get.tool_name(), "kubectl_get");
        assert_eq!(CommandOp::Annotate.tool_name(), "kubectl_annotate");
        let reindent: Vec<_> = CommandOp::ALL.iter().filter(|o| o.reindents_json()).collect();
        assert_eq!(reindent, vec![&CommandOp::Get, &CommandOp::Apply]);
    }

    #[test]
    fn every_op_declares_unique_keys() {
        for op in CommandOp::ALL {
            let params = op.params();
            let mut keys: Vec<_> = params.iter().map(|p| p.key.as_str()).collect();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), params.len(), "{} has duplicate keys", op);
        }
    }

    #[test]
    fn get_struct_direct() {
        let args = GetArgs { resource: Some("pods"), output: Some("wide"), sort_by: Some(".metadata.name"), ..Default::default() };
        assert_eq!(args.to_command().expect("build").joined(), "get pods -o wide --sort-by .metadata.name");
    }

    #[test]
    fn image_only_for_deployments() {
        let args = CreateArgs { resource: Some("namespace"), name: Some("team-a"), image: Some("nginx"), ..Default::default() };
        assert_eq!(args.to_command().expect("build").joined(), "create namespace team-a");
    }

    #[test]
    fn apply_validate_false_uses_equals_syntax() {
        let args = ApplyArgs { filename: Some("m.yaml"), validate: false, ..Default::default() };
        assert_eq!(args.to_command().expect("build").joined(), "apply -f m.yaml --validate=false");
    }
}
