//! End-to-end rendering scenarios against a shared "John Doe" context.

use markup_core::{Object, PipeError, Template, Value};
use markup_renderer::{register_include, register_pipe, render, render_with, Options, Registry, Renderer};
use rstest::rstest;
use serde_json::json;

fn context() -> Value {
    Value::from(json!({
        "name": {"first": "John", "middle": "", "last": "Doe"},
        "age": 33.3,
        "weight": 145,
        "gender": "male",
        "alias": " J. Doe ",
        "phone": "",
        "fax": " ",
        "address": "1 Maple Street",
        "zip": "12345",
        "race": null,
        "brothers": ["Jack", "Joe", "Jim"],
        "sisters": [{"name": "Jill"}, {"name": "Jen"}],
        "cousin": {"name": {"first": "Jake"}},
        "children": [],
        "path": "example.com?a=b c=d",
        "link": "<a href=\"http://www.example.com\">example.com</a>",
        "greet": " Top  of  the  morning ",
        "parents": null,
        "truthy": true,
        "falsy": false,
        "obj": {"truthy": true, "falsy": false}
    }))
}

fn up(template: &str, context: &Value) -> String {
    render(template, context).expect("template parses")
}

fn number_arg(args: &[String]) -> Result<f64, PipeError> {
    args.first()
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| PipeError::custom("expected a number"))
}

// ---------------------------------------------------------------------------
// Shared context
// ---------------------------------------------------------------------------

#[rstest]
// scalars and whitespace
#[case("gender: {{gender}}", "gender: male")]
#[case("gender: {{ gender }}", "gender: male")]
#[case("gender: {{ gender | upcase }}", "gender: MALE")]
#[case("gender: {{ gender | upcase | downcase }}", "gender: male")]
#[case("{{alias}}", " J. Doe ")]
#[case("\n{{alias}}\n", "\n J. Doe \n")]
// paths
#[case("{{name.last}}, {{   name.first   }}", "Doe, John")]
#[case("{{name.last|downcase}}, {{name.first|upcase}}", "doe, JOHN")]
#[case("{{name}}Last name: {{last}}{{/name}}", "Last name: Doe")]
#[case("{{cousin}}{{name.first}}{{/cousin}}", "Jake")]
#[case("{{cousin}}{{name.last}}{{/cousin}}", "???")]
#[case("First brother: {{brothers.0}}", "First brother: Jack")]
#[case("First sister: {{sisters.0.name}}", "First sister: Jill")]
#[case("First sister: {{sisters.0.name|upcase}}", "First sister: JILL")]
// null, absent, booleans
#[case("age: {{age|round}}", "age: 33")]
#[case("race: {{race|blank>N/A}}", "race: N/A")]
#[case("whatever: {{whatever|blank>N/A}}", "whatever: ???")]
#[case("{{truthy}} {{falsy}}", "true false")]
#[case("{{obj.truthy}} {{obj.falsy}}", "true false")]
// chains and arrays
#[case("gender: {{gender|upcase|chop>2}}", "gender: MA...")]
#[case("gender: {{gender | upcase | chop > 2 }}", "gender: MA...")]
#[case("brothers: {{brothers}}", "brothers: JackJoeJim")]
#[case("brothers: {{brothers|join> * }}", "brothers: Jack * Joe * Jim")]
#[case("brothers: {{brothers|join> * /}}", "brothers: Jack * Joe * Jim")]
#[case("brothers: {{brothers}} {{brothers}}", "brothers: JackJoeJim JackJoeJim")]
#[case("brothers: {{brothers}}+{{.}}+{{/brothers}}", "brothers: +Jack++Joe++Jim+")]
#[case("brothers: {{brothers}}+{{.|upcase}}+{{/brothers}}", "brothers: +JACK++JOE++JIM+")]
#[case("brothers: {{brothers|sort|join> @ }}", "brothers: Jack @ Jim @ Joe")]
#[case("sisters: {{sisters}}<li>{{name}}</li>{{/sisters}}", "sisters: <li>Jill</li><li>Jen</li>")]
#[case("sisters: {{sisters|reverse}}<li>{{name}}</li>{{/sisters}}", "sisters: <li>Jen</li><li>Jill</li>")]
#[case("sisters: {{sisters|reverse}}<li>{{name|upcase}}</li>{{/sisters}}", "sisters: <li>JEN</li><li>JILL</li>")]
#[case("obj: {{obj|upcase}}", "obj: [OBJECT OBJECT]")]
// if / else
#[case("{{if brothers}}{{brothers|size}} brothers{{/if}}", "3 brothers")]
#[case("{{if brothers|empty}}***{{/if}}", "")]
#[case("{{if brothers|more>2}}yes!{{/if}}", "yes!")]
#[case("{{if gender|equals>male}}{{gender}}!{{/if}}", "male!")]
#[case("{{if gender|equals>male}}{{age}}!{{/if}}", "33.3!")]
#[case("{{name}}{{first}}{{if .|equals>John}}***{{/if}}{{/first}}{{/name}}", "***")]
#[case("{{if brothers|more>4}}no!{{/if}}", "")]
#[case("{{if brothers|more>1}}yes!{{else}}no!{{/if}}", "yes!")]
#[case("{{if brothers|less>1}}yes!{{else}}no!{{/if}}", "no!")]
#[case("{{if brothers|more>1}}{{brothers.0}}{{else}}no!{{/if}}", "Jack")]
#[case("{{if brothers|less>1}}yes!{{else}}{{brothers.1}}{{/if}}", "Joe")]
#[case("{{if brothers|notempty}}***{{/if}}", "***")]
#[case("{{if parents|empty}}***{{/if}}", "***")]
#[case("{{if parents|notempty}}***{{/if}}", "")]
// iteration counters
#[case("{{brothers}}{{#}}-{{.}} {{/brothers}}", "0-Jack 1-Joe 2-Jim ")]
#[case("{{brothers}}{{##}}-{{.}} {{/brothers}}", "1-Jack 2-Joe 3-Jim ")]
#[case("{{brothers|limit>1}}{{#}}-{{.}}{{/brothers}}", "0-Jack")]
#[case("{{brothers}}{{if #|ormore>2}}{{#}}-{{.}}-{{#}}{{/if}}{{/brothers}}", "2-Jim-2")]
#[case("{{brothers}}{{if #|more>0|less>2}}{{.}}{{/if}}{{/brothers}}", "Joe")]
#[case("{{brothers}}{{if #|even}}{{.}}{{/if}}{{/brothers}}", "JackJim")]
#[case("{{brothers}}{{if ##|even}}{{.}}{{/if}}{{/brothers}}", "Joe")]
#[case("{{brothers}}{{if #|odd}}{{.}}{{/if}}{{/brothers}}", "Joe")]
#[case("{{sisters}}{{#|fix>2}} {{/sisters}}", "0.00 1.00 ")]
// pipe catalog
#[case("{{name.middle|blank>N/A}}", "N/A")]
#[case("{{if name.middle|empty}}***{{/if}}", "***")]
#[case("{{if fax|empty}}***{{/if}}", "***")]
#[case("{{if children|empty}}***{{/if}}", "***")]
#[case("{{if name.middle|notempty}}***{{/if}}", "")]
#[case("{{if fax|notempty}}***{{/if}}", "")]
#[case("{{if children|notempty}}***{{/if}}", "")]
#[case("{{brothers|limit>1}}{{.}}{{/brothers}}", "Jack")]
#[case("{{if brothers|more>3}}***{{/if}}", "")]
#[case("{{if brothers|ormore>3}}***{{/if}}", "***")]
#[case("{{if brothers|less>3}}{{.}}{{/if}}", "")]
#[case("{{if brothers|orless>3}}***{{/if}}", "***")]
#[case("{{if brothers|between>1>100}}***{{/if}}", "***")]
#[case("{{if brothers|between>50>100}}***{{/if}}", "")]
#[case("{{if age|between>30>40}}***{{/if}}", "***")]
#[case("{{if age|between>40>50}}***{{/if}}", "")]
#[case("{{if age|equals>33.3}}{{age}}{{/if}}", "33.3")]
#[case("{{if age|notequals>33.3}}{{age}}{{/if}}", "")]
#[case("{{if name.first|like>Jo*}}{{name.last}}{{/if}}", "Doe")]
#[case("{{if name.first|like>Adam}}{{name.first}}{{/if}}", "")]
#[case("{{if name.first|notlike>Jo*}}{{name.first}}{{/if}}", "")]
#[case("{{alias|trim}}", "J. Doe")]
#[case("{{greet|pack}}", "Top of the morning")]
#[case("{{name.first|upcase}}", "JOHN")]
#[case("{{name.first|downcase}}", "john")]
#[case("{{name.first|chop>1}}", "J...")]
#[case("{{name.first|chop>100}}", "John")]
#[case("{{sisters|size}}", "2")]
#[case("{{children|size}}", "0")]
#[case("{{name.first|size}}", "4")]
#[case("{{name.last|length}}", "3")]
#[case("{{name.first|style>a b}}", "<span class=\"a b\">John</span>")]
#[case("{{link|clean}}", "example.com")]
#[case("{{address|sub>Maple>Elm}}", "1 Elm Street")]
#[case("{{address|sub>1>2|sub>Maple>Elm}}", "2 Elm Street")]
#[case("{{brothers|reverse}}", "JimJoeJack")]
#[case("{{brothers|join}}", "Jack,Joe,Jim")]
#[case("{{brothers|join>-}}", "Jack-Joe-Jim")]
#[case("{{brothers|slice>1>1}}", "Joe")]
#[case("{{brothers|slice>1>2|join>-}}", "Joe-Jim")]
#[case("{{brothers|sort|join}}", "Jack,Jim,Joe")]
#[case("{{sisters|sort>name}}*{{name}}*{{/sisters}}", "*Jen**Jill*")]
#[case("{{sisters|sort>name|reverse}}*{{name}}*{{/sisters}}", "*Jill**Jen*")]
#[case("{{age|more>30|choose>Old>Young}}", "Old")]
#[case("{{age|less>30|choose>Old>Young}}", "Young")]
#[case("{{zip|empty|choose>unzippy>zippy}}", "zippy")]
#[case("{{age|fix>3}}", "33.300")]
#[case("{{weight|mod>50}}", "45")]
#[case("{{if weight|divisible>5}}***{{/if}}", "***")]
#[case("{{if weight|more>200|divisible>5}}***{{/if}}", "")]
#[case("{{if weight|divisible>7}}***{{/if}}", "")]
#[case("{{if falsy|divisible>7}}***{{/if}}", "")]
#[case("{{path|url}}", "example.com?a=b%20c=d")]
#[case("{{name.first|empty|bool}}", "false")]
#[case("{{name.first|notempty|bool}}", "true")]
#[case("{{brothers|empty|bool}}", "false")]
// additions beyond the classic suite
#[case("{{greet|trim|capcase}}", "Top  Of  The  Morning")]
#[case("{{greet|tease>2}}", "Top of...")]
#[case("{{brothers|first}} {{brothers|last}}", "Jack Jim")]
#[case("{{address|split> |join>_}}", "1_Maple_Street")]
#[case("{{gender|toggle>male,female>M,F>?}}", "M")]
#[case("{{zip|number|mod>1000}}", "345")]
#[case("{{race|falsy}}", "true")]
#[case("{{gender|log>who}}", "male")]
#[case("{{brothers|join>a\\|b}}", "Jacka|bJoea|bJim")]
fn resolves_against_shared_context(#[case] template: &str, #[case] expected: &str) {
    assert_eq!(up(template, &context()), expected);
}

// ---------------------------------------------------------------------------
// Other contexts
// ---------------------------------------------------------------------------

#[test]
fn resolves_template_with_no_context() {
    assert_eq!(up("La la la", &Value::default()), "La la la");
    assert_eq!(up("La la {{la}}", &Value::default()), "La la ???");
}

#[test]
fn resolves_object_self_reference() {
    let adam = Object::builder("Adam")
        .field("age", 36)
        .method("getName", |_, _| Ok(Value::from("Adam")))
        .build();
    let ctx = Value::from(json!({})).with_entry("adam", adam);
    assert_eq!(up("Name: {{adam}}{{.|call>getName}}{{/adam}}", &ctx), "Name: Adam");
    assert_eq!(up("Age: {{adam.age}}", &ctx), "Age: 36");

    let num = Value::from(json!({"num": 123}));
    assert_eq!(up("Num: {{num}}{{.|call>toFixed>1}}{{/num}}", &num), "Num: 123.0");
}

#[rstest]
#[case("{{n|more>123}}", json!({"n": 124}), "124")]
#[case("{{n|more>125}}", json!({"n": 124}), "false")]
#[case("{{n|more>123}}", json!({"n": "124"}), "124")]
#[case("{{n|more>125}}", json!({"n": "124"}), "false")]
#[case("{{n|more>a}}", json!({"n": "b"}), "b")]
#[case("{{n|more>c}}", json!({"n": "b"}), "false")]
#[case("{{n|ormore>b}}", json!({"n": "b"}), "b")]
#[case("{{num|even}}", json!({"num": 222}), "222")]
#[case("{{num|even}}", json!({"num": 333}), "false")]
#[case("{{num|odd}}", json!({"num": 222}), "false")]
#[case("{{num|odd}}", json!({"num": 333}), "333")]
#[case("{{a|call>toPrecision>5}}", json!({"a": 1, "b": 2, "c": 3}), "1.0000")]
#[case("{{a|call>join>*}}", json!({"a": ["ad", "am", "ma", "rk"]}), "ad*am*ma*rk")]
#[case("{{a|call>getFullYear|equals>2011|choose>Yes>No}}", json!({"a": "2011-02-01"}), "Yes")]
#[case("{{a|call>getFullYear|more>2020|choose>Yes>No}}", json!({"a": "2011-02-01"}), "No")]
#[case("{{a|call>nope}}", json!({"a": "2011-02-01"}), "???")]
#[case(
    "{{a|fix>0}} {{a|round}} {{b|fix>1}} {{a|call>toFixed>0}}",
    json!({"a": 2.5, "b": 0.25}),
    "3 3 0.3 3"
)]
#[case("{{s|call>repeat>99999999999999999999}}", json!({"s": "ab"}), "???")]
#[case("{{s|call>padStart>99999999999999999999}}", json!({"s": "ab"}), "???")]
#[case("{{xs|sort|join>,}}", json!({"xs": ["17a", 9, "10", "b2", 3]}), "3,9,10,17a,b2")]
#[case("{{n}}", json!({"n": 1e21}), "1e+21")]
#[case(
    "{{n}}{{if ##|more>5|divisible>3}}{{##}}{{/if}}.{{/n}}",
    json!({"n": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]}),
    ".....6...9...12."
)]
fn resolves_small_contexts(#[case] template: &str, #[case] ctx: serde_json::Value, #[case] expected: &str) {
    assert_eq!(up(template, &Value::from(ctx)), expected);
}

#[test]
fn resolves_call_on_objects() {
    let doggy = Object::builder("Doggy")
        .field("TYPE_MUTT", "Mutt")
        .field("TYPE_GOLDEN", "Golden Retriever")
        .method("greet", |_, _| Ok(Value::from("Woof!")))
        .method("getBreed", |this, args| {
            let key = match args.first().map(String::as_str) {
                Some("Milo") => "TYPE_MUTT",
                Some("Barkley") => "TYPE_GOLDEN",
                _ => return Ok(Value::from("N/A")),
            };
            Ok(this.field(key).cloned().unwrap_or(Value::Null))
        })
        .build();
    let ctx = Value::from(json!({})).with_entry("doggy", doggy);

    assert_eq!(up("{{doggy|call>greet}}", &ctx), "Woof!");
    assert_eq!(up("{{doggy|call>greet|upcase}}", &ctx), "WOOF!");
    assert_eq!(up("{{doggy|call>getBreed}}", &ctx), "N/A");
    assert_eq!(up("{{doggy|call>getBreed>Milo}}", &ctx), "Mutt");
    assert_eq!(up("{{doggy|call>getBreed>Milo|call>toLowerCase}}", &ctx), "mutt");
    assert_eq!(up("{{doggy|call>bark}}", &ctx), "???");
}

// ---------------------------------------------------------------------------
// Custom pipes and includes
// ---------------------------------------------------------------------------

#[test]
fn resolves_custom_pipes() {
    let options = Options::new()
        .pipe("times", |v, args| {
            let n = v.to_number().ok_or_else(|| PipeError::custom("not a number"))?;
            Ok(Value::Number(n * number_arg(args)?))
        })
        .expect("valid pipe");
    let out = render_with("brothers: {{brothers|size|times>3}}", &context(), &options).expect("parse");
    assert_eq!(out, "brothers: 9");

    register_pipe("divide", |v, args| {
        let n = v.to_number().ok_or_else(|| PipeError::custom("not a number"))?;
        Ok(Value::Number(n / number_arg(args)?))
    })
    .expect("register divide");
    assert_eq!(up("brothers: {{brothers|size|divide>3}}", &context()), "brothers: 1");
}

#[test]
fn resolves_includes() {
    let options = Options::new()
        .include("greeting", "My name is {{name.first|upcase}}!")
        .expect("valid include");
    let out = render_with("Hello! {{greeting}}", &context(), &options).expect("parse");
    assert_eq!(out, "Hello! My name is JOHN!");

    register_include("greeting", "My name is {{name.first|downcase}}!").expect("register greeting");
    assert_eq!(up("Hello! {{greeting}}", &context()), "Hello! My name is john!");
    assert_eq!(up("Hello! {{greeting|upcase}}", &context()), "Hello! MY NAME IS JOHN!");
}

#[test]
fn dynamic_includes_are_produced_per_render() {
    let options = Options::new()
        .include_fn("banner", || "== {{name.last}} ==".to_string())
        .expect("valid include");
    let out = render_with("{{banner}}", &context(), &options).expect("parse");
    assert_eq!(out, "== Doe ==");
}

#[test]
fn includes_see_the_current_scope() {
    let mut registry = Registry::new();
    registry.register_include("item", "<{{name}}>").expect("include");
    let template = Template::parse("{{sisters}}{{item}}{{/sisters}}").expect("parse");
    assert_eq!(Renderer::new(&registry).render(&template, &context()), "<Jill><Jen>");
}

#[test]
fn parse_errors_surface_from_string_entry_points() {
    assert!(render("{{name", &context()).is_err());
    assert!(render("{{/name}}", &context()).is_err());
}
