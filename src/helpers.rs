//! Presentational template helpers.
//!
//! Pure markup generators used by the layouts: magazine-grid cell sizing,
//! responsive `<picture>` markup and the share menu. They are registered as
//! Tera functions by [`register`].

use anyhow::{Context, Result};
use std::collections::HashMap;
use tera::{Tera, Value};
use url::Url;

/// Desktop column span for the first eight grid positions.
const DESKTOP_SPANS: [u8; 8] = [12, 6, 6, 12, 7, 5, 5, 7];

/// Span for positions outside the table
const FULL_WIDTH: u8 = 12;

/// Lists shorter than this remap their last two cells.
const SHORT_LIST: i64 = 8;

/// Responsive grid classes for the post at `index` of `length` posts.
///
/// In short lists the last two posts use a negative index so they fall back
/// to full-width desktop cells.
pub fn post_cell(index: i64, length: i64) -> String {
    let is_tail = length < SHORT_LIST && matches!(length.checked_sub(index), Some(1 | 2));

    // a remapped index is negative, which is past the span table
    let desktop = usize::try_from(index)
        .ok()
        .filter(|_| !is_tail)
        .and_then(|i| DESKTOP_SPANS.get(i).copied())
        .unwrap_or(FULL_WIDTH);

    format!("mdl-cell--{desktop}-col-desktop mdl-cell--8-col-tablet mdl-cell--4-col-phone")
}

/// `<picture>` with webp/jpg sources for desktop, tablet and mobile.
pub fn post_illustration(thumb: &str, alt: &str) -> String {
    format!(
        r#"
    <picture class="safe-picture">
      <source media="(min-width: 1025px)"
              srcset="{thumb}.webp 1x, {thumb}@2x.webp 2x"
              type="image/webp">
      <source media="(min-width: 1025px)"
              srcset="{thumb}.jpg 1x, {thumb}@2x.jpg 2x">
      <source media="(min-width: 768px)"
              srcset="{thumb}-tablet.webp 1x, {thumb}-tablet@2x.webp 2x"
              type="image/webp">
      <source media="(min-width: 768px)"
              srcset="{thumb}-tablet.jpg 1x, {thumb}-tablet@2x.jpg 2x">
      <source srcset="{thumb}-mobile.webp 1x, {thumb}-mobile@2x.webp 2x"
              type="image/webp">
      <source srcset="{thumb}-mobile.jpg 1x, {thumb}-mobile@2x.jpg 2x">
      <img src="{thumb}.jpg" alt="{alt}" class="safe-picture__img">
    </picture>"#
    )
}

/// Resolve `path` against `siteurl` the way a browser resolves a link.
pub fn resolve_link(siteurl: &str, path: &str) -> Result<String> {
    let base = Url::parse(siteurl).with_context(|| format!("invalid site url `{siteurl}`"))?;
    let link = base
        .join(path)
        .with_context(|| format!("cannot resolve `{path}` against `{siteurl}`"))?;
    Ok(link.into())
}

/// Share menu with Twitter and Facebook links for the page at `path`.
pub fn post_share(siteurl: &str, path: &str, id: i64) -> Result<String> {
    let link = resolve_link(siteurl, path)?;

    Ok(format!(
        r##"
    <div class="mdl-card__menu post-share">
      <button id="share-menu-{id}"
              class="mdl-button mdl-button--icon mdl-js-button mdl-js-ripple-effect post-share__button"
              title="Share this post">
        <svg class="mdl-svg post-share__icon">
          <use xlink:href="#share"></use>
        </svg>
      </button>
      <ul class="mdl-menu mdl-menu--bottom-right mdl-js-menu mdl-js-ripple-effect share-menu"
          for="share-menu-{id}">
        <li class="mdl-menu__item share-menu__item">
          <a href="//twitter.com/home?status={link}" class="share-menu__link" target="_blank" rel="nofollow">
            <svg class="share-menu__icon">
              <use xlink:href="#twitter"></use>
            </svg>
            Twitter
          </a>
        </li>
        <li class="mdl-menu__item share-menu__item">
          <a href="//www.facebook.com/sharer.php?u={link}" class="share-menu__link" target="_blank" rel="nofollow">
            <svg class="share-menu__icon">
              <use xlink:href="#facebook"></use>
            </svg>
            Facebook
          </a>
        </li>
      </ul>
    </div>"##
    ))
}

// ============================================================================
// Tera registration
// ============================================================================

/// Register the helpers plus the `permalink` filter on `tera`.
pub fn register(tera: &mut Tera) {
    tera.register_function("post_cell", |args: &HashMap<String, Value>| {
        let index = int_arg(args, "post_cell", "index")?;
        let length = int_arg(args, "post_cell", "length")?;
        Ok(Value::String(post_cell(index, length)))
    });

    tera.register_function("post_illustration", |args: &HashMap<String, Value>| {
        let thumb = str_arg(args, "post_illustration", "thumb")?;
        let alt = args.get("alt").and_then(Value::as_str).unwrap_or_default();
        Ok(Value::String(post_illustration(thumb, alt)))
    });

    tera.register_function("post_share", |args: &HashMap<String, Value>| {
        let siteurl = str_arg(args, "post_share", "siteurl")?;
        let path = str_arg(args, "post_share", "path")?;
        let id = args.get("id").and_then(Value::as_i64).unwrap_or(0);
        post_share(siteurl, path, id)
            .map(Value::String)
            .map_err(|err| tera::Error::msg(format!("post_share: {err:#}")))
    });

    tera.register_filter(
        "permalink",
        |value: &Value, _: &HashMap<String, Value>| match value.as_str() {
            Some(path) => Ok(Value::String(crate::utils::slug::permalink(path))),
            None => Err(tera::Error::msg("permalink: expected a path string")),
        },
    );
}

fn int_arg(args: &HashMap<String, Value>, func: &str, name: &str) -> tera::Result<i64> {
    args.get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| tera::Error::msg(format!("{func}: `{name}` must be an integer")))
}

fn str_arg<'a>(args: &'a HashMap<String, Value>, func: &str, name: &str) -> tera::Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg(format!("{func}: `{name}` must be a string")))
}
