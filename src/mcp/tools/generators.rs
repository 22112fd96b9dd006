//! Template generator tools.
//!
//! Each handler parses its validated arguments into typed values and hands them
//! to a renderer in [`crate::templates`].

use chrono::Utc;

use crate::schema::SchemaNode;
use crate::templates::{
    self, AdrStatus, ApiStyle, CiLanguage, CiService, PdcaPhase, RetroKind, TestScope,
};
use crate::tool::{Args, ToolCallResult, ToolContext, ToolDescriptor, ToolError, ToolHandler};

pub struct PdcaGenerate;

impl ToolHandler for PdcaGenerate {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "pdca_generate",
            "Generate a PDCA (plan/do/check/act) worksheet for an artifact.",
            SchemaNode::object()
                .required_property("phase", SchemaNode::string_enum(["plan", "do", "check", "act"]))
                .required_property("artifact", SchemaNode::string())
                .property("scope", SchemaNode::string().with_default("feature".into()))
                .property("metrics", SchemaNode::string().with_default("".into()))
                .property(
                    "risk",
                    SchemaNode::string_enum(["low", "med", "high"]).with_default("low".into()),
                ),
        )
    }

    fn call(&self, _ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let phase: PdcaPhase = args.parse("phase")?;
        let artifact = args.required_str("artifact")?;
        Ok(ToolCallResult::text(templates::pdca(
            phase,
            artifact,
            args.str_or("scope", "feature"),
            args.str("metrics").unwrap_or_default(),
            args.str_or("risk", "low"),
        )))
    }
}

pub struct RetroCreate;

impl ToolHandler for RetroCreate {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "retro_create",
            "Create a retrospective template for a sprint, release or incident.",
            SchemaNode::object()
                .property(
                    "type",
                    SchemaNode::string_enum(["sprint", "release", "incident"])
                        .with_default("sprint".into()),
                )
                .property("window", SchemaNode::string().with_default("last 2 weeks".into())),
        )
    }

    fn call(&self, _ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let kind: RetroKind = args.parse("type")?;
        Ok(ToolCallResult::text(templates::retro(
            kind,
            args.str_or("window", "last 2 weeks"),
        )))
    }
}

pub struct ApiScaffold;

impl ToolHandler for ApiScaffold {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "api_scaffold",
            "Scaffold an API skeleton: OpenAPI for REST or a proto file for gRPC.",
            SchemaNode::object()
                .required_property("name", SchemaNode::string())
                .property(
                    "style",
                    SchemaNode::string_enum(["rest", "grpc"]).with_default("rest".into()),
                )
                .property("version", SchemaNode::string().with_default("v1".into())),
        )
    }

    fn call(&self, _ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let name = args.required_str("name")?;
        let style: ApiStyle = args.parse("style")?;
        let body = templates::api_scaffold(name, style, args.str_or("version", "v1"))?;
        Ok(ToolCallResult::text(body))
    }
}

pub struct CiConfigure;

impl ToolHandler for CiConfigure {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "ci_configure",
            "Generate a CI pipeline for GitHub Actions or GitLab CI.",
            SchemaNode::object()
                .property(
                    "service",
                    SchemaNode::string_enum(["github", "gitlab"]).with_default("github".into()),
                )
                .property("env", SchemaNode::string().with_default("dev".into()))
                .property(
                    "language",
                    SchemaNode::string_enum(["node", "rust", "python"]).with_default("node".into()),
                ),
        )
    }

    fn call(&self, _ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let service: CiService = args.parse("service")?;
        let language: CiLanguage = args.parse("language")?;
        let body = templates::ci_pipeline(service, args.str_or("env", "dev"), language)?;
        Ok(ToolCallResult::text(body))
    }
}

pub struct TestsPlan;

impl ToolHandler for TestsPlan {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "tests_plan",
            "Draft a test plan for a file, module or service.",
            SchemaNode::object()
                .property(
                    "scope",
                    SchemaNode::string_enum(["file", "module", "service"]).with_default("file".into()),
                )
                .required_property("target", SchemaNode::string()),
        )
    }

    fn call(&self, _ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let scope: TestScope = args.parse("scope")?;
        let target = args.required_str("target")?;
        Ok(ToolCallResult::text(templates::tests_plan(scope, target)))
    }
}

pub struct ArchAdr;

impl ToolHandler for ArchAdr {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "arch_adr",
            "Write an architecture decision record (ADR).",
            SchemaNode::object()
                .required_property("system", SchemaNode::string())
                .property("decision", SchemaNode::string())
                .property(
                    "status",
                    SchemaNode::string_enum(["proposed", "accepted", "superseded"])
                        .with_default("proposed".into()),
                ),
        )
    }

    fn call(&self, _ctx: &ToolContext, args: &Args) -> Result<ToolCallResult, ToolError> {
        let system = args.required_str("system")?;
        let status: AdrStatus = args.parse("status")?;
        let date = Utc::now().format("%Y-%m-%d").to_string();
        Ok(ToolCallResult::text(templates::adr(
            system,
            args.str("decision"),
            status,
            &date,
        )))
    }
}
