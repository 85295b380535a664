use crate::{
    ast::{Method, PrimitiveKind},
    codegen::{
        cpp::{
            base_file,
            begin_header,
            close_namespaces,
            cmd_name,
            end_header,
            header_file,
            local_prefix,
            log_tag,
            open_namespaces,
            types,
        },
        writer::CodeWriter,
        Context,
        GeneratedFile,
    },
    error::Result,
    utils::to_snake_case,
};

const INVALID_PARAM: &str = "return HDF_ERR_INVALID_PARAM;";

pub(super) fn emit(ctx: &Context) -> Result<Vec<GeneratedFile>> {
    Ok(vec![header(ctx)?, source(ctx)?])
}

fn handler(ctx: &Context, method: &Method) -> String {
    format!("{}Stub{}", ctx.base(), method.name)
}

fn header(ctx: &Context) -> Result<GeneratedFile> {
    let name = &ctx.ast.name;
    let stub = format!("{}Stub", ctx.base());
    let local = local_prefix(ctx);
    let file = base_file(ctx, "stub", "h");
    let mut w = CodeWriter::spaces();

    begin_header(&mut w, ctx, &file);
    w.line(format!("#include \"{}\"", header_file(ctx.ast)));
    w.line("#include <ipc_object_stub.h>");
    w.line("#include <message_option.h>");
    w.line("#include <message_parcel.h>");
    w.line("#include <refbase.h>");
    w.blank();
    open_namespaces(&mut w, ctx);

    w.line(format!("class {} : public IPCObjectStub {{", stub));
    w.line("public:");
    w.indent();
    w.line(format!("explicit {}(const sptr<{}> &impl);", stub, name));
    w.line(format!("virtual ~{}();", stub));
    w.blank();
    w.line("int32_t OnRemoteRequest(uint32_t code, MessageParcel &data, MessageParcel &reply,");
    w.line("    MessageOption &option) override;");
    w.blank();
    w.dedent();
    w.line("private:");
    w.indent();
    for (_, method) in ctx.methods()? {
        w.line(format!(
            "int32_t {}(MessageParcel& {l}Data, MessageParcel& {l}Reply, MessageOption& {l}Option);",
            handler(ctx, method),
            l = local
        ));
        w.blank();
    }
    w.line(format!("sptr<{}> impl_;", name));
    w.dedent();
    w.line("};");

    end_header(&mut w, ctx, &file);
    Ok(GeneratedFile {
        name:     file,
        contents: w.finish(),
    })
}

fn source(ctx: &Context) -> Result<GeneratedFile> {
    let name = &ctx.ast.name;
    let stub = format!("{}Stub", ctx.base());
    let methods = ctx.methods()?;
    let mut w = CodeWriter::spaces();

    ctx.license(&mut w);
    w.line(format!("#include \"{}\"", base_file(ctx, "stub", "h")));
    w.line("#include <hdf_base.h>");
    w.line("#include <hdf_log.h>");
    w.line("#include <object_collector.h>");
    w.line("#include <securec.h>");
    w.line("#include <string_ex.h>");
    log_tag(&mut w, &format!("{}_stub", to_snake_case(ctx.base())));
    open_namespaces(&mut w, ctx);

    w.line(format!(
        "{s}::{s}(const sptr<{}> &impl) : IPCObjectStub({}::GetDescriptor()), impl_(impl)",
        name,
        name,
        s = stub
    ));
    w.line("{");
    w.line("}");
    w.blank();
    w.line(format!("{s}::~{s}()", s = stub));
    w.open("{");
    w.line("impl_ = nullptr;");
    w.close("}");
    w.blank();

    w.line(format!(
        "int32_t {}::OnRemoteRequest(uint32_t code, MessageParcel& data, MessageParcel& reply, MessageOption& option)",
        stub
    ));
    w.open("{");
    w.open(format!("if (data.ReadInterfaceToken() != {}::GetDescriptor()) {{", name));
    w.line("HDF_LOGE(\"%{public}s: interface token check failed!\", __func__);");
    w.line("return HDF_ERR_INVALID_PARAM;");
    w.close("}");
    w.blank();
    w.open("switch (code) {");
    for (_, method) in &methods {
        w.line(format!("case {}:", cmd_name(ctx, method)));
        w.indent();
        w.line(format!("return {}(data, reply, option);", handler(ctx, method)));
        w.dedent();
    }
    w.open("default: {");
    w.line("HDF_LOGE(\"%{public}s: cmd %{public}d is not supported\", __func__, code);");
    w.line("return HDF_ERR_INVALID_PARAM;");
    w.close("}");
    w.close("}");
    w.close("}");
    w.blank();

    for (_, method) in &methods {
        stub_method(&mut w, ctx, method)?;
        w.blank();
    }

    close_namespaces(&mut w, ctx);
    Ok(GeneratedFile {
        name:     base_file(ctx, "stub", "cpp"),
        contents: w.finish(),
    })
}

fn stub_method(w: &mut CodeWriter, ctx: &Context, method: &Method) -> Result<()> {
    let types = ctx.types();
    let local = local_prefix(ctx);
    let data = format!("{}Data", local);
    let reply = format!("{}Reply", local);
    let ret = format!("{}Ret", local);
    let mem_set = format!("{}MemSet", local);

    w.line(format!(
        "int32_t {}Stub::{}(MessageParcel& {l}Data, MessageParcel& {l}Reply, MessageOption& {l}Option)",
        ctx.base(),
        handler(ctx, method),
        l = local
    ));
    w.open("{");

    let capacity_params: Vec<_> = method.capacity_params(types).collect();
    if !capacity_params.is_empty() {
        w.line(format!("bool {} = false;", mem_set));
        types::guard(
            w,
            &format!("!{}.ReadBool({})", data, mem_set),
            "read flag of memory setting",
            INVALID_PARAM,
        );
        for param in &capacity_params {
            w.line(format!("uint32_t {}Cap = HDI_BUFF_MAX_SIZE;", param.name));
        }
        w.open(format!("if ({}) {{", mem_set));
        for param in &capacity_params {
            types::guard(
                w,
                &format!("!{}.ReadUint32({}Cap)", data, param.name),
                &format!("read {} capacity", param.name),
                INVALID_PARAM,
            );
            let too_big = match types.element(param.ty) {
                Some(element) => format!(
                    "{}Cap > HDI_BUFF_MAX_SIZE / sizeof({})",
                    param.name,
                    types::cpp_type(ctx, element)?
                ),
                None => format!("{}Cap > HDI_BUFF_MAX_SIZE", param.name),
            };
            types::guard(w, &too_big, &format!("check {} capacity", param.name), INVALID_PARAM);
        }
        w.close("}");
        w.blank();
    }

    for param in method.in_params() {
        w.line(types::local_decl(ctx, param.ty, &param.name)?);
        types::read(w, ctx, param.ty, &data, &param.name, INVALID_PARAM, 0)?;
        w.blank();
    }
    for param in method.out_params() {
        w.line(types::local_decl(ctx, param.ty, &param.name)?);
    }
    for param in &capacity_params {
        if types.element(param.ty).is_some() {
            w.open(format!("if ({}) {{", mem_set));
            w.line(format!("{n}.reserve({n}Cap);", n = param.name));
            w.close("}");
        }
    }
    w.blank();

    w.open("if (impl_ == nullptr) {");
    w.line("HDF_LOGE(\"%{public}s: impl_ is nullptr!\", __func__);");
    w.line("return HDF_ERR_INVALID_OBJECT;");
    w.close("}");
    w.blank();
    let args: Vec<&str> = method.params.iter().map(|p| p.name.as_str()).collect();
    w.line(format!("int32_t {} = impl_->{}({});", ret, method.name, args.join(", ")));
    w.open(format!("if ({} != HDF_SUCCESS) {{", ret));
    w.line(format!(
        "HDF_LOGE(\"%{{public}}s failed, error code is %{{public}}d\", __func__, {});",
        ret
    ));
    w.line(format!("return {};", ret));
    w.close("}");
    w.blank();

    for param in &capacity_params {
        let too_big = if types.as_primitive(param.ty) == Some(PrimitiveKind::String) {
            format!("{n}.size() >= {n}Cap", n = param.name)
        } else {
            format!("{n}.size() > {n}Cap", n = param.name)
        };
        types::guard(w, &too_big, &format!("check {} capacity", param.name), INVALID_PARAM);
    }
    if !capacity_params.is_empty() {
        w.blank();
    }

    for param in method.out_params() {
        types::write(w, ctx, param.ty, &reply, &param.name, INVALID_PARAM, 0)?;
        w.blank();
    }
    w.line(format!("return {};", ret));
    w.close("}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::{
        ast::AstModule,
        codegen::CodeGenerator,
        error::Diagnostics,
        options::{Language, Options},
        parser::Parser,
    };

    const SAMPLE: &str = "package ohos.hdi.sample.v1_0;

interface ISample {
    Collect([in] int limit, [out] List<int> ids, [out] String label);
}
";

    fn stub_source() -> String {
        let options = Options {
            language: Some(Language::Cpp),
            ..Options::default()
        };
        let mut module = AstModule::new();
        let mut diagnostics = Diagnostics::new();
        let ok = Parser::new(&options, &mut module, &mut diagnostics)
            .parse_source(Path::new("ohos/hdi/sample/v1_0/ISample.idl"), SAMPLE);
        assert!(ok, "{}", diagnostics);

        let ast = module.get(module.find("ohos.hdi.sample.v1_0.ISample").unwrap());
        CodeGenerator::new(&options, &module)
            .render(ast)
            .unwrap()
            .into_iter()
            .find(|file| file.name == "sample_stub.cpp")
            .unwrap()
            .contents
    }

    #[test]
    fn caller_capacities_are_bounded_before_reserving() {
        let stub = stub_source();
        let read = stub.find("ReadUint32(idsCap)").unwrap();
        let check = stub.find("idsCap > HDI_BUFF_MAX_SIZE / sizeof(int32_t)").unwrap();
        let reserve = stub.find("ids.reserve(idsCap);").unwrap();
        assert!(read < check && check < reserve);
        assert!(stub.contains("labelCap > HDI_BUFF_MAX_SIZE"));
    }
}
