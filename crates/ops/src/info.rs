use crate::formula::{check_requirements, find_formula};
use crate::{FormulaInfo, OpsCtx};
use pinst_errors::Error;
use std::path::Path;

/// Describe a formula: metadata, destination and runtime requirements
///
/// # Errors
///
/// Returns `FormulaNotFound` if no formula exists for `identifier`, or an
/// error if the formula is invalid.
pub async fn info(
    ctx: &OpsCtx,
    identifier: &str,
    formula_path: Option<&Path>,
) -> Result<FormulaInfo, Error> {
    let Some(loaded) = find_formula(ctx, identifier, formula_path, false).await? else {
        return Err(Error::internal("formula lookup returned nothing"));
    };
    let formula = loaded.formula;
    let destination = ctx.config.destination();
    let installed = tokio::fs::try_exists(destination.join(formula.bin_name()))
        .await
        .unwrap_or(false);

    Ok(FormulaInfo {
        requirements: check_requirements(&formula.depends_on),
        caveats: formula.render_caveats(&destination),
        pinned: formula.pinned_checksum()?.is_some(),
        bin: formula.bin_name().to_string(),
        entry: formula.install.entry.clone(),
        name: formula.name,
        desc: formula.desc,
        homepage: formula.homepage,
        license: formula.license,
        version: formula.version,
        url: formula.url,
        installed,
        destination,
        source: loaded.source,
    })
}
