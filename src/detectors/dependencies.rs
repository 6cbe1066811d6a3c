use super::{DetectContext, Detector, DetectorError, DetectorId};
use crate::analysis::{Analysis, Dependency, DependencyType, Facet};
use crate::stack::manifest::{CargoManifest, GoMod, PackageJson, PyProject};
use crate::stack::DeclaredDependency;

/// Direct dependencies declared by root manifests
pub struct DependenciesDetector;

/// Path fragments marking vendored or internal modules
const VENDORED_FRAGMENTS: &[&str] = &["/internal/", "/service/internal/", "/feature/"];

/// Whether a module path points at vendored or internal code
pub fn is_vendored_path(path: &str) -> bool {
    VENDORED_FRAGMENTS.iter().any(|frag| path.contains(frag))
}

impl Detector for DependenciesDetector {
    fn id(&self) -> DetectorId {
        DetectorId::Dependencies
    }

    fn detect(&self, ctx: &DetectContext, _analysis: &Analysis) -> Result<Facet, DetectorError> {
        let mut dependencies = Vec::new();

        if let Some(content) = ctx.read_if_present("package.json")? {
            let pkg = PackageJson::parse(&content)
                .map_err(|e| DetectorError::manifest("package.json", e))?;
            dependencies.extend(pkg.declared().into_iter().map(to_dependency));
        }

        if let Some(content) = ctx.read_if_present("go.mod")? {
            let go_mod = GoMod::parse(&content);
            dependencies.extend(
                go_mod
                    .requires
                    .into_iter()
                    .filter(|r| !r.indirect && !is_vendored_path(&r.path))
                    .map(|r| Dependency {
                        name: r.path,
                        version: r.version,
                        dep_type: DependencyType::Runtime,
                    }),
            );
        }

        if let Some(content) = ctx.read_if_present("Cargo.toml")? {
            let cargo = CargoManifest::parse(&content)
                .map_err(|e| DetectorError::manifest("Cargo.toml", e))?;
            dependencies.extend(cargo.dependencies.into_iter().map(to_dependency));
        }

        if let Some(content) = ctx.read_if_present("pyproject.toml")? {
            let project = PyProject::parse(&content)
                .map_err(|e| DetectorError::manifest("pyproject.toml", e))?;
            dependencies.extend(project.dependencies.into_iter().map(to_dependency));
        }

        Ok(Facet::Dependencies(dependencies))
    }
}

fn to_dependency(declared: DeclaredDependency) -> Dependency {
    Dependency {
        name: declared.name,
        version: declared.version,
        dep_type: if declared.dev {
            DependencyType::Dev
        } else {
            DependencyType::Runtime
        },
    }
}
