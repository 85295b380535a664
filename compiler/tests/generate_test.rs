use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use hdi_gen_compiler::{run, BuildTarget, DiagnosticKind, DumpFormat, HdiError, Language, Options, PackageRoot};

const SAMPLE: &str = "package ohos.hdi.sample.v1_0;

interface ISample {
    ping([in] int request, [out] int response);
}
";

const TYPES: &str = "/* Copyright (c) Sample Authors */
package ohos.hdi.sample.v1_0;

enum Mode { IDLE, BUSY = 4 };

struct Info {
    String name;
    int id;
};
";

const SERVICE: &str = "package ohos.hdi.sample.v1_0;

import ohos.hdi.sample.v1_0.Types;
import ohos.hdi.sample.v1_0.ISampleCallback;

interface ISample {
    GetInfo([in] String name, [out] Info info);
    SetMode([in] Mode mode);
    ListIds([out] List<int> ids);
    Register([in] ISampleCallback cbObj);
}
";

const CALLBACK: &str = "package ohos.hdi.sample.v1_0;

[callback] interface ISampleCallback {
    OnEvent([in] int code);
}
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Workspace {
        Workspace {
            dir: TempDir::new().unwrap(),
        }
    }

    fn idl_root(&self) -> PathBuf {
        self.dir.path().join("idl")
    }

    fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Writes `text` to `idl/<relative>` and returns the full path.
    fn write(&self, relative: &str, text: &str) -> PathBuf {
        let path = self.idl_root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn options(&self, sources: Vec<PathBuf>, language: Language) -> Options {
        Options {
            sources,
            out_dir: Some(self.out_dir()),
            roots: vec![PackageRoot {
                package: "ohos.hdi".to_owned(),
                path:    self.idl_root(),
            }],
            language: Some(language),
            ..Options::default()
        }
    }

    /// Every generated file, keyed by its path relative to the output root.
    fn generated(&self) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        collect(&self.out_dir(), &self.out_dir(), &mut files);
        files
    }
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<String, String>) {
    let Ok(entries) = fs::read_dir(dir) else { return };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let relative = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            files.insert(relative, fs::read_to_string(&path).unwrap());
        }
    }
}

fn names(files: &BTreeMap<String, String>) -> Vec<&str> {
    files.keys().map(String::as_str).collect()
}

const PKG: &str = "ohos/hdi/sample/v1_0";

fn file<'a>(files: &'a BTreeMap<String, String>, name: &str) -> &'a str {
    files
        .get(&format!("{}/{}", PKG, name))
        .unwrap_or_else(|| panic!("{} was not generated", name))
}

#[test]
fn sample_interface_all_build() {
    let ws = Workspace::new();
    let source = ws.write("sample/v1_0/ISample.idl", SAMPLE);
    run(&ws.options(vec![source], Language::C)).unwrap();

    let files = ws.generated();
    assert_eq!(
        names(&files),
        [
            "ohos/hdi/sample/v1_0/i_sample.h",
            "ohos/hdi/sample/v1_0/sample_driver.c",
            "ohos/hdi/sample/v1_0/sample_proxy.c",
            "ohos/hdi/sample/v1_0/sample_service.c",
            "ohos/hdi/sample/v1_0/sample_stub.c",
            "ohos/hdi/sample/v1_0/sample_stub.h",
        ]
    );

    let header = file(&files, "i_sample.h");
    assert!(header.contains("CMD_SAMPLE_PING = 0,"));
    assert!(header.contains("CMD_SAMPLE_GET_VERSION = 1,"));

    let proxy = file(&files, "sample_proxy.c");
    let body = &proxy[proxy.find("static int32_t SampleProxyping(").unwrap()..];
    let write = body.find("HdfSbufWriteInt32(sampleData, request)").unwrap();
    let call = body.find("CMD_SAMPLE_PING").unwrap();
    let read = body.find("HdfSbufReadInt32(sampleReply, response)").unwrap();
    assert!(write < call && call < read);

    let stub = file(&files, "sample_stub.c");
    assert!(stub.contains("case CMD_SAMPLE_PING:"));
    let handler = &stub[stub.find("static int32_t SerStubping(").unwrap()..];
    let read = handler.find("request").unwrap();
    let call = handler.find("serviceImpl->ping(").unwrap();
    let write = handler.find("HdfSbufWriteInt32(sampleReply, response)").unwrap();
    assert!(read < call && call < write);
}

#[test]
fn client_build_matches_all_build() {
    let all = Workspace::new();
    let source = all.write("sample/v1_0/ISample.idl", SAMPLE);
    run(&all.options(vec![source], Language::C)).unwrap();

    let client = Workspace::new();
    let source = client.write("sample/v1_0/ISample.idl", SAMPLE);
    let mut options = client.options(vec![source], Language::C);
    options.build_target = BuildTarget::Client;
    run(&options).unwrap();

    let all_files = all.generated();
    let client_files = client.generated();
    assert_eq!(
        names(&client_files),
        ["ohos/hdi/sample/v1_0/i_sample.h", "ohos/hdi/sample/v1_0/sample_proxy.c"]
    );
    for (name, contents) in &client_files {
        assert_eq!(contents, &all_files[name], "{} differs", name);
    }
}

#[test]
fn misplaced_package_generates_nothing() {
    let ws = Workspace::new();
    let source = ws.write("other/v1_0/ISample.idl", SAMPLE);
    let err = run(&ws.options(vec![source], Language::C)).unwrap_err();
    match err {
        HdiError::Compile(diagnostics) => assert!(diagnostics.has_kind(DiagnosticKind::Semantic)),
        other => panic!("unexpected error: {}", other),
    }
    assert!(ws.generated().is_empty());
}

#[test]
fn import_cycle_generates_nothing() {
    let ws = Workspace::new();
    let first = ws.write(
        "sample/v1_0/First.idl",
        "package ohos.hdi.sample.v1_0;\nimport ohos.hdi.sample.v1_0.Second;\nstruct A { int x; };\n",
    );
    ws.write(
        "sample/v1_0/Second.idl",
        "package ohos.hdi.sample.v1_0;\nimport ohos.hdi.sample.v1_0.First;\nstruct B { int y; };\n",
    );
    let err = run(&ws.options(vec![first], Language::C)).unwrap_err();
    assert!(matches!(err, HdiError::Cycle { .. }), "{}", err);
    assert!(ws.generated().is_empty());
}

#[test]
fn output_is_independent_of_input_order() {
    let build = |reverse: bool| {
        let ws = Workspace::new();
        let mut sources = vec![
            ws.write("sample/v1_0/ISample.idl", SERVICE),
            ws.write("sample/v1_0/Types.idl", TYPES),
            ws.write("sample/v1_0/ISampleCallback.idl", CALLBACK),
        ];
        if reverse {
            sources.reverse();
        }
        run(&ws.options(sources, Language::Cpp)).unwrap();
        ws.generated()
    };
    assert_eq!(build(false), build(true));
    assert_eq!(build(false), build(false));
}

#[test]
fn callbacks_get_the_served_side_without_a_driver() {
    let ws = Workspace::new();
    ws.write("sample/v1_0/Types.idl", TYPES);
    ws.write("sample/v1_0/ISampleCallback.idl", CALLBACK);
    let source = ws.write("sample/v1_0/ISample.idl", SERVICE);
    let mut options = ws.options(vec![source], Language::C);
    options.build_target = BuildTarget::Client;
    run(&options).unwrap();

    let files = ws.generated();
    assert_eq!(
        names(&files),
        [
            "ohos/hdi/sample/v1_0/i_sample.h",
            "ohos/hdi/sample/v1_0/i_sample_callback.h",
            "ohos/hdi/sample/v1_0/sample_callback_proxy.c",
            "ohos/hdi/sample/v1_0/sample_callback_service.c",
            "ohos/hdi/sample/v1_0/sample_callback_stub.c",
            "ohos/hdi/sample/v1_0/sample_callback_stub.h",
            "ohos/hdi/sample/v1_0/sample_proxy.c",
            "ohos/hdi/sample/v1_0/types.c",
            "ohos/hdi/sample/v1_0/types.h",
        ]
    );

    let types = file(&files, "types.h");
    assert!(types.starts_with("/* Copyright (c) Sample Authors */"));
    assert!(types.contains("bool InfoBlockMarshalling(struct HdfSBuf *data, const struct Info *dataBlock);"));
    assert!(types.contains("BUSY = 4,"));
}

#[test]
fn cpp_build() {
    let ws = Workspace::new();
    ws.write("sample/v1_0/Types.idl", TYPES);
    ws.write("sample/v1_0/ISampleCallback.idl", CALLBACK);
    let source = ws.write("sample/v1_0/ISample.idl", SERVICE);
    run(&ws.options(vec![source], Language::Cpp)).unwrap();

    let files = ws.generated();
    for name in [
        "isample.h",
        "sample_proxy.h",
        "sample_proxy.cpp",
        "sample_stub.h",
        "sample_stub.cpp",
        "sample_driver.cpp",
        "sample_service.h",
        "sample_service.cpp",
        "types.h",
        "types.cpp",
    ] {
        file(&files, name);
    }

    let header = file(&files, "isample.h");
    assert!(header.contains("namespace OHOS {"));
    assert!(header.contains("namespace Sample {"));
    assert!(header.contains("class ISample : public HdiBase {"));
    assert!(header.contains("CMD_SAMPLE_GET_VERSION = 4,"));

    let stub = file(&files, "sample_stub.cpp");
    assert!(stub.contains("case CMD_SAMPLE_LIST_IDS:"));
    assert!(stub.contains("if (data.ReadInterfaceToken() != ISample::GetDescriptor()) {"));

    let types = file(&files, "types.h");
    assert!(types.contains("enum Mode : int32_t {"));
}

#[test]
fn lite_interfaces_only_exist_in_kernel_builds() {
    let lite = "package ohos.hdi.sample.v1_0;\n[lite] interface ILight {\n    Blink([in] int times);\n}\n";

    let user = Workspace::new();
    let source = user.write("sample/v1_0/ILight.idl", lite);
    run(&user.options(vec![source], Language::C)).unwrap();
    assert!(user.generated().is_empty());

    let kernel = Workspace::new();
    let source = kernel.write("sample/v1_0/ILight.idl", lite);
    let mut options = kernel.options(vec![source], Language::C);
    options.kernel = true;
    run(&options).unwrap();
    let files = kernel.generated();
    assert!(file(&files, "i_light.h").contains("CMD_LIGHT_BLINK = 0,"));
    file(&files, "light_proxy.c");
}

#[test]
fn java_build_is_client_only() {
    let ws = Workspace::new();
    ws.write("sample/v1_0/Types.idl", TYPES);
    let source = ws.write(
        "sample/v1_0/ISample.idl",
        "package ohos.hdi.sample.v1_0;\nimport ohos.hdi.sample.v1_0.Types;\n\
         interface ISample {\n    GetInfo([in] String name, [out] Info info);\n    ListIds([out] List<int> ids);\n}\n",
    );
    run(&ws.options(vec![source], Language::Java)).unwrap();

    let files = ws.generated();
    assert_eq!(
        names(&files),
        [
            "ohos/hdi/sample/v1_0/ISample.java",
            "ohos/hdi/sample/v1_0/SampleProxy.java",
            "ohos/hdi/sample/v1_0/Types.java",
        ]
    );
    let interface = file(&files, "ISample.java");
    assert!(interface.starts_with("package ohos.hdi.sample.v1_0;"));
    assert!(interface.contains("int getInfo(String name, Types.Info info) throws RemoteException;"));
    assert!(interface.contains("int getVersion(int[] majorVer, int[] minorVer) throws RemoteException;"));

    let types = file(&files, "Types.java");
    assert!(types.contains("public static final class Info implements Sequenceable {"));
    assert!(types.contains("BUSY(4);"));
}

#[test]
fn java_rejects_the_server_target() {
    let ws = Workspace::new();
    let source = ws.write("sample/v1_0/ISample.idl", SAMPLE);
    let mut options = ws.options(vec![source], Language::Java);
    options.build_target = BuildTarget::Server;
    assert!(matches!(run(&options), Err(HdiError::Options(_))));
}

#[test]
fn gen_hash_skips_compilation() {
    let ws = Workspace::new();
    let source = ws.write("sample/v1_0/ISample.idl", "this is not idl");
    let options = Options {
        sources: vec![source.clone()],
        gen_hash: true,
        ..Options::default()
    };
    let output = run(&options).unwrap();
    assert_eq!(output.hashes.len(), 1);
    let (path, hash) = output.hashes[0].rsplit_once(':').unwrap();
    assert_eq!(path, source.display().to_string());
    assert_eq!(hash.len(), 64);
    assert!(ws.generated().is_empty());
}

#[test]
fn dump_without_generation() {
    let ws = Workspace::new();
    let source = ws.write("sample/v1_0/ISample.idl", SAMPLE);
    let mut options = ws.options(vec![source], Language::C);
    options.out_dir = None;
    options.language = None;
    options.dump_ast = true;
    options.dump_format = DumpFormat::Json;

    let output = run(&options).unwrap();
    let dump: serde_json::Value = serde_json::from_str(output.dump.as_deref().unwrap()).unwrap();
    let units = dump.as_array().unwrap();
    assert_eq!(units.len(), 1);
    assert!(output.written.is_empty());
    assert!(ws.generated().is_empty());
}
