//! Sibling page showing how extra pages are attached to an app.

use encore_core::{PassContext, Result};

pub fn page(ctx: &mut PassContext) -> Result<()> {
    ctx.set_page_config("multiple page example", Some("❤️"))?;
    ctx.markdown(
        "# multiple page example\n\
         I just created this page only for trying an example of attaching an additional page.",
    )?;
    ctx.sidebar(|ctx| ctx.header("my multiple page example"))?;
    ctx.write("This demo shows how to add additional page to main page")
}
