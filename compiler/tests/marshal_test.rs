use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use hdi_gen_compiler::{ast::AstModule, compile, marshal::RequestCodec, HdiError, Options, PackageRoot};
use hdi_parcel::Value;

const TYPES: &str = "package ohos.hdi.sample.v1_0;

struct Info {
    String name;
    List<int> ids;
};
";

const SAMPLE: &str = "package ohos.hdi.sample.v1_0;

import ohos.hdi.sample.v1_0.Types;

interface ISample {
    Describe([in] Info info, [in] int verbosity, [out] String text, [out] List<int> ids);
    Touch([in] int id);
}
";

fn compile_sample() -> AstModule {
    let dir = TempDir::new().unwrap();
    let package_dir = dir.path().join("sample/v1_0");
    fs::create_dir_all(&package_dir).unwrap();
    fs::write(package_dir.join("Types.idl"), TYPES).unwrap();
    let source: PathBuf = package_dir.join("ISample.idl");
    fs::write(&source, SAMPLE).unwrap();

    let options = Options {
        sources: vec![source],
        roots: vec![PackageRoot {
            package: "ohos.hdi".to_owned(),
            path:    dir.path().to_path_buf(),
        }],
        ..Options::default()
    };
    compile(&options).unwrap()
}

fn info(name: &str, ids: &[i32]) -> Value {
    Value::Struct(vec![
        ("name".to_owned(), Value::String(name.to_owned())),
        ("ids".to_owned(), Value::Seq(ids.iter().map(|&id| Value::I32(id)).collect())),
    ])
}

#[test]
fn proxy_and_stub_agree_on_a_request() {
    let module = compile_sample();
    let ast = module.get(module.find("ohos.hdi.sample.v1_0.ISample").unwrap());
    let interface = module.interface_of(ast).unwrap();
    let (id, describe) = interface.commands().next().unwrap();
    assert_eq!(id, 0);
    let codec = RequestCodec::new(&module.types, describe);

    let in_args = [info("camera", &[1, 2, 3]), Value::I32(2)];
    let bytes = codec.encode_request(&in_args, Some(&[16, 4])).unwrap();
    let request = codec.decode_request(&bytes).unwrap();
    assert_eq!(request.in_args, in_args);
    assert_eq!(request.capacities, Some(vec![16, 4]));

    let out_args = [
        Value::String("camera: 3 ids".to_owned()),
        Value::Seq(vec![Value::I32(1), Value::I32(2)]),
    ];
    let reply = codec.encode_reply(&request, &out_args).unwrap();
    assert_eq!(codec.decode_reply(&reply).unwrap(), out_args);
}

#[test]
fn reply_larger_than_the_caller_buffer_is_refused() {
    let module = compile_sample();
    let ast = module.get(module.find("ohos.hdi.sample.v1_0.ISample").unwrap());
    let (_, describe) = module.interface_of(ast).unwrap().commands().next().unwrap();
    let codec = RequestCodec::new(&module.types, describe);

    let bytes = codec
        .encode_request(&[info("mic", &[]), Value::I32(0)], Some(&[4, 8]))
        .unwrap();
    let request = codec.decode_request(&bytes).unwrap();

    // Four bytes leave no room for the terminator of "mic:".
    let err = codec
        .encode_reply(&request, &[Value::String("mic:".to_owned()), Value::Seq(vec![])])
        .unwrap_err();
    assert!(matches!(err, HdiError::Parcel(_) | HdiError::Marshal(_)), "{}", err);

    // Without the flag the stub applies no caller limit.
    let bytes = codec.encode_request(&[info("mic", &[]), Value::I32(0)], None).unwrap();
    let request = codec.decode_request(&bytes).unwrap();
    assert_eq!(request.capacities, None);
    codec
        .encode_reply(&request, &[Value::String("mic: no ids".to_owned()), Value::Seq(vec![])])
        .unwrap();
}

#[test]
fn methods_without_sized_outputs_carry_no_flag() {
    let module = compile_sample();
    let ast = module.get(module.find("ohos.hdi.sample.v1_0.ISample").unwrap());
    let (id, touch) = module.interface_of(ast).unwrap().commands().nth(1).unwrap();
    assert_eq!(id, 1);
    let codec = RequestCodec::new(&module.types, touch);

    let bytes = codec.encode_request(&[Value::I32(7)], None).unwrap();
    assert_eq!(bytes.len(), 4);
    assert_eq!(codec.decode_request(&bytes).unwrap().in_args, [Value::I32(7)]);
}
