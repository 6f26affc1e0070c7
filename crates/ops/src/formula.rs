//! Formula lookup and turning a request into a validated plan

use crate::{InstallRequest, OpsCtx, Requirement};
use pinst_config::constants::FORMULA_EXTENSION;
use pinst_errors::{Error, ResolveError};
use pinst_install::InstallOptions;
use pinst_resolver::IndexSource;
use pinst_types::{
    Checksum, Formula, InstallTarget, PackageSpec, PinnedChecksum, SmokeTest, VersionSelector,
    DEFAULT_MODE,
};
use std::path::{Path, PathBuf};

/// A formula and the file it came from
pub(crate) struct LoadedFormula {
    pub formula: Formula,
    pub source: PathBuf,
}

/// Everything derived from a request before touching the network
pub(crate) struct Plan {
    pub spec: PackageSpec,
    pub formula: Option<LoadedFormula>,
    pub index: IndexSource,
    pub target: InstallTarget,
    pub options: InstallOptions,
}

pub(crate) async fn read_formula(path: &Path) -> Result<LoadedFormula, Error> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_with_path(&e, path))?;
    let formula = Formula::from_toml_str(&path.display().to_string(), &contents)?;
    tracing::debug!(formula = %formula.name, source = %path.display(), "loaded formula");
    Ok(LoadedFormula {
        formula,
        source: path.to_path_buf(),
    })
}

/// `--formula`, else `<formula_dir>/<identifier>.toml`, else nothing when an
/// ad-hoc `--url` is given.
pub(crate) async fn find_formula(
    ctx: &OpsCtx,
    identifier: &str,
    explicit: Option<&Path>,
    has_url: bool,
) -> Result<Option<LoadedFormula>, Error> {
    if let Some(path) = explicit {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ResolveError::FormulaNotFound {
                identifier: identifier.to_string(),
                searched: path.display().to_string(),
            }
            .into());
        }
        return read_formula(path).await.map(Some);
    }

    let dir = ctx.config.formula_dir();
    let candidate = dir.join(format!("{identifier}.{FORMULA_EXTENSION}"));
    if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
        return read_formula(&candidate).await.map(Some);
    }

    if has_url {
        Ok(None)
    } else {
        Err(ResolveError::FormulaNotFound {
            identifier: identifier.to_string(),
            searched: dir.display().to_string(),
        }
        .into())
    }
}

/// Merge request, formula and configuration into a validated plan
pub(crate) async fn plan(ctx: &OpsCtx, request: &InstallRequest) -> Result<Plan, Error> {
    let formula = find_formula(
        ctx,
        &request.identifier,
        request.formula.as_deref(),
        request.url.is_some(),
    )
    .await?;
    let recipe = formula.as_ref().map(|loaded| &loaded.formula);

    if let Some(recipe) = recipe {
        if recipe.name != request.identifier {
            tracing::warn!(
                identifier = %request.identifier,
                formula = %recipe.name,
                "formula name differs from requested identifier"
            );
        }
    }

    let version = match (&request.version, recipe) {
        (Some(raw), _) => raw.parse::<VersionSelector>()?,
        (None, Some(recipe)) => recipe.declared_version()?.unwrap_or(VersionSelector::Latest),
        (None, None) => VersionSelector::Latest,
    };

    let url_template = request
        .url
        .clone()
        .or_else(|| recipe.map(|r| r.url.clone()))
        .unwrap_or_default();

    let checksum = match (&request.checksum, recipe) {
        (Some(raw), _) => Some(PinnedChecksum::any(Checksum::parse(raw)?)),
        (None, Some(recipe)) => recipe.pinned_checksum()?,
        (None, None) => None,
    };

    let entry = request
        .entry
        .clone()
        .or_else(|| recipe.and_then(|r| r.install.entry.clone()));
    let bin_name = request
        .bin
        .clone()
        .or_else(|| recipe.map(|r| r.bin_name().to_string()))
        .unwrap_or_else(|| request.identifier.clone());

    let spec = PackageSpec {
        identifier: request.identifier.clone(),
        version,
        url_template,
        checksum,
        entry: entry.clone(),
        bin_name,
    };
    spec.validate()?;

    let destination = request
        .destination
        .clone()
        .unwrap_or_else(|| ctx.config.destination());
    let mode = recipe.map_or(DEFAULT_MODE, |r| r.install.mode);
    let target = InstallTarget::new(destination, spec.bin_name.clone()).with_mode(mode);

    let smoke_test = if request.skip_smoke_test || !ctx.config.install.smoke_test {
        None
    } else {
        // configuration caps the formula's timeout
        recipe.and_then(|r| r.test.clone()).map(|test| SmokeTest {
            timeout_secs: test.timeout_secs.min(ctx.config.install.smoke_test_timeout),
            ..test
        })
    };

    let index = recipe.map_or(IndexSource::None, IndexSource::from_formula);

    Ok(Plan {
        spec,
        formula,
        index,
        target,
        options: InstallOptions {
            entry,
            smoke_test,
            max_entry_size: ctx.config.install.max_entry_size,
            cancel: ctx.cancel.clone(),
        },
    })
}

/// Look up each runtime requirement on `PATH`
pub(crate) fn check_requirements(names: &[String]) -> Vec<Requirement> {
    names
        .iter()
        .map(|name| Requirement {
            name: name.clone(),
            found: which::which(name).ok(),
        })
        .collect()
}
