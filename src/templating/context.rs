//! The fixed variable table recipes are rendered against.

use std::collections::BTreeMap;

use super::platform::Arch;
use super::value::{Builtin, Value};

/// Default interpreter version assumed by `py`, `python` and `PY_VER`.
pub const DEFAULT_PYTHON: &str = "3.11";

/// Default `numpy`/`npy` binding.
pub const DEFAULT_NUMPY: &str = "1.26";

/// Inputs of the variable table.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Architectures selector lines are evaluated against.
    pub archs: Vec<Arch>,
    /// Interpreter version, `major.minor`.
    pub python: String,
    pub numpy: String,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(Arch::DEFAULT.to_vec())
    }
}

impl RenderContext {
    pub fn new(archs: Vec<Arch>) -> Self {
        Self {
            archs,
            python: DEFAULT_PYTHON.to_string(),
            numpy: DEFAULT_NUMPY.to_string(),
        }
    }

    /// Architecture the platform variables describe.
    pub fn target(&self) -> Arch {
        Arch::primary(&self.archs)
    }

    /// Build the variable bindings.
    pub fn variables(&self) -> BTreeMap<String, Value> {
        let target = self.target();
        let mut vars = BTreeMap::new();
        let mut bind = |name: &str, value: Value| {
            vars.insert(name.to_string(), value);
        };

        bind("target_platform", Value::str(target.as_str()));
        bind("build_platform", Value::str(target.as_str()));
        for flag in ["linux", "osx", "win", "unix", "x86_64", "aarch64", "arm64", "ppc64le", "s390x"] {
            bind(flag, Value::Bool(target.flag(flag).unwrap_or(false)));
        }

        let py_nodot = self.python.replace('.', "");
        bind("py", Value::Int(py_nodot.parse().unwrap_or(311)));
        bind("py3k", Value::Bool(self.python.starts_with('3')));
        bind("python", Value::str(&self.python));
        bind("PY_VER", Value::str(&self.python));
        bind(
            "PYTHON",
            Value::str(if target == Arch::Win64 { "%PYTHON%" } else { "$PYTHON" }),
        );
        bind("python_impl", Value::str("cpython"));
        bind("npy", Value::Int(self.numpy.replace('.', "").parse().unwrap_or(126)));
        bind("numpy", Value::str(&self.numpy));
        bind("blas_impl", Value::str("openblas"));
        bind("mpi", Value::str("nompi"));
        bind("environ", Value::Map(BTreeMap::new()));

        bind("compiler", Value::Func(Builtin::Compiler));
        bind("stdlib", Value::Func(Builtin::Stdlib));
        bind("cdt", Value::Func(Builtin::Cdt));
        bind("pin_subpackage", Value::Func(Builtin::PinSubpackage));
        bind("pin_compatible", Value::Func(Builtin::PinCompatible));
        bind("load_setup_py_data", Value::Func(Builtin::LoadSetupPyData));
        bind("load_file_regex", Value::Func(Builtin::LoadFileRegex));
        bind("load_file_data", Value::Func(Builtin::LoadFileData));
        vars
    }
}

impl Builtin {
    /// Invoke the callable. Only positional arguments matter.
    pub fn call(self, args: &[Value], target: Arch) -> Value {
        let first = args.first().map(ToString::to_string).unwrap_or_default();
        match self {
            Builtin::Compiler => {
                let native = compiler_package(&first, target);
                Value::Str(format!("{native}_{target}"))
            }
            Builtin::Stdlib => {
                let native = match target {
                    Arch::Osx64 | Arch::OsxArm64 => "macosx_deployment_target",
                    Arch::Win64 => "vs",
                    _ => "sysroot",
                };
                Value::Str(format!("{native}_{target}"))
            }
            Builtin::Cdt => Value::Str(format!("{first}-cos7-{}", target.machine())),
            Builtin::PinSubpackage | Builtin::PinCompatible => Value::Str(first),
            Builtin::LoadSetupPyData | Builtin::LoadFileRegex | Builtin::LoadFileData => Value::Inert,
        }
    }
}

fn compiler_package(language: &str, target: Arch) -> String {
    let osx = target.is_osx();
    let win = target == Arch::Win64;
    match language {
        "c" if osx => "clang".to_string(),
        "cxx" if osx => "clangxx".to_string(),
        "c" | "cxx" if win => "vs2019".to_string(),
        "c" => "gcc".to_string(),
        "cxx" => "gxx".to_string(),
        "fortran" => "gfortran".to_string(),
        "rust" => "rust".to_string(),
        "go" => "go-cgo".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_variables() {
        let vars = RenderContext::new(vec![Arch::Noarch, Arch::OsxArm64]).variables();
        assert_eq!(vars["target_platform"], Value::str("osx-arm64"));
        assert_eq!(vars["osx"], Value::Bool(true));
        assert_eq!(vars["linux"], Value::Bool(false));
        assert_eq!(vars["py"], Value::Int(311));
        assert_eq!(vars["PYTHON"], Value::str("$PYTHON"));
    }

    #[test]
    fn test_builtins() {
        let c = Value::str("c");
        assert_eq!(Builtin::Compiler.call(&[c.clone()], Arch::Linux64), Value::str("gcc_linux-64"));
        assert_eq!(Builtin::Compiler.call(&[c], Arch::OsxArm64), Value::str("clang_osx-arm64"));
        assert_eq!(
            Builtin::Stdlib.call(&[Value::str("c")], Arch::Linux64),
            Value::str("sysroot_linux-64")
        );
        assert_eq!(
            Builtin::Cdt.call(&[Value::str("libx11-devel")], Arch::LinuxAarch64),
            Value::str("libx11-devel-cos7-aarch64")
        );
        assert_eq!(
            Builtin::PinSubpackage.call(&[Value::str("libfoo")], Arch::Linux64),
            Value::str("libfoo")
        );
        assert_eq!(Builtin::LoadSetupPyData.call(&[], Arch::Linux64), Value::Inert);
    }
}
