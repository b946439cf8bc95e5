//! Main page: a tour of elements, widgets and layout.

use encore_core::{
    Button, Checkbox, Choice, Element, PassContext, RangeSlider, Result, Slider, Table, TextInput,
};

use super::normal_table;

const WELCOME: &str = "\
encore is a page engine built for quick data and machine learning front ends.
**👈 Select a demo from the sidebar** to see some examples of what it can do!
### Want to learn more?
- Every widget change reruns the page from the top
- Values you want to keep go in the session store
### See more complex demos
- Try the *example page* in the sidebar";

const TOPIC: &str = "\
# TOPIC
(write some topic here.)  
(aaaa)  
(bbbb)";

const CACHING: &str = "\
@st.cache_data  # cache the function's return value
def long_running_function(param1, param2):
    return ...

@st.cache_resource  # cache unserializable objects such as models or connections
ml_model = LogisticRegression(C = 0.8, random_state=123)";

const HOUSES: [&str; 4] = ["Gryffindor", "Ravenclaw", "Hufflepuff", "Slytherin"];
const CONTACT: [&str; 3] = ["Email", "Home phone", "Mobile phone"];

pub fn page(ctx: &mut PassContext) -> Result<()> {
    ctx.set_page_config("Hello", Some("👋"))?;

    welcome(ctx)?;
    data_frames(ctx)?;
    charts_and_maps(ctx)?;
    widgets(ctx)?;
    layout(ctx)?;
    progress(ctx)?;

    ctx.write("# Caching")?;
    ctx.code(CACHING, Some("python"))
}

fn welcome(ctx: &mut PassContext) -> Result<()> {
    ctx.write("# :balloon: Welcome to encore")?;
    ctx.write("# Welcome to encore! 👋")?;
    ctx.sidebar(|ctx| ctx.success("Select a demo above."))?;
    ctx.markdown(WELCOME)?;

    ctx.write("# Added block")?;
    ctx.markdown(TOPIC)?;
    ctx.latex(r"Factor\space model:\space x = \Lambda f + \Psi^{1/2}u")
}

fn first_columns() -> Result<Table> {
    Table::from_columns([
        ("first column".to_string(), vec![1, 2, 3, 4]),
        ("second column".to_string(), vec![10, 20, 30, 40]),
    ])
}

fn data_frames(ctx: &mut PassContext) -> Result<()> {
    ctx.write("## 1. Show a data frame")?;
    ctx.write(&first_columns()?)?;

    let names: Vec<String> = (0..20).map(|i| format!("col {}", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let dataframe = normal_table(ctx.rng(), 10, &names, 1.0, &[])?;

    ctx.write("dataframe ↓")?;
    ctx.dataframe(dataframe.clone(), true)?;

    ctx.write("table ↓")?;
    ctx.table(dataframe)
}

fn charts_and_maps(ctx: &mut PassContext) -> Result<()> {
    ctx.write("# draw charts and maps")?;
    let chart_data = normal_table(ctx.rng(), 20, &["a", "b", "c"], 1.0, &[])?;
    ctx.line_chart(chart_data)?;

    let map_data = normal_table(ctx.rng(), 1000, &["lat", "lon"], 1.0 / 50.0, &[37.76, -122.4])?;
    ctx.map(map_data)?;

    ctx.write("## Around Shinjuku")?;
    let map_data = normal_table(ctx.rng(), 30, &["lat", "lon"], 1.0 / 100.0, &[35.69, 139.70])?;
    ctx.map(map_data)
}

fn widgets(ctx: &mut PassContext) -> Result<()> {
    ctx.write("# Widgets")?;
    let x = ctx.slider(Slider::new("x"))? as i64;
    ctx.text(format!("{} squared is {}", x, x * x))?;

    ctx.text_input(TextInput::new("Your name").key("name"))?;
    // The value is also readable straight from the store.
    let name: String = ctx.state().get_as("name").unwrap_or_default();
    if !name.is_empty() {
        ctx.write(&name)?;
    }

    ctx.write("## use checkboxes to show/hide data")?;
    if ctx.checkbox(Checkbox::new("show dataframe"))? {
        let chart_data = normal_table(ctx.rng(), 20, &["a", "b", "c"], 1.0, &[])?;
        ctx.write(&chart_data)?;
    }

    ctx.write("## use a selectbox for options")?;
    let numbers: Vec<String> = first_columns()?
        .column("first column")
        .unwrap_or_default()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    let option = ctx.selectbox(Choice::select(
        "Which number do you like the best?",
        numbers.as_slice(),
    ))?;
    ctx.write(&format!("you selected: {}", option))
}

fn layout(ctx: &mut PassContext) -> Result<()> {
    ctx.write("## Layout")?;

    ctx.sidebar(|ctx| {
        ctx.selectbox(Choice::select("How would you like to be contacted?", &CONTACT))?;
        ctx.range_slider(RangeSlider::new(
            "select a range of values",
            0.0,
            100.0,
            (25.0, 75.0),
        ))
    })?;

    let columns = ctx.columns(2)?;
    ctx.with_container(columns[0], |ctx| ctx.button(Button::new("Press me!")))?;
    ctx.with_container(columns[1], |ctx| {
        let chosen = ctx.radio(Choice::radio("sorting hat", &HOUSES))?;
        ctx.write(&format!("You are in {} house!", chosen))
    })
}

fn progress(ctx: &mut PassContext) -> Result<()> {
    ctx.write("## show progress")?;
    ctx.write("starting a long computation...")?;

    let latest_iteration = ctx.empty()?;
    let bar = ctx.progress(0)?;
    for i in 1..=100u8 {
        ctx.update(
            latest_iteration,
            Element::Text {
                body: format!("Iteration {}", i),
            },
        )?;
        ctx.update(bar, Element::Progress { value: i })?;
    }

    ctx.write("...and now we're done!")
}
