use colloquy::{MatchError, ReplyDetails};

/// What a fragment of the turn report is, independent of how it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Input,
    Section,
    Reply,
    Strategy,
    Pattern,
    Count,
    Label,
    Miss,
    Hint,
}

impl Role {
    /// SGR parameters for this role.
    fn sgr(self) -> &'static str {
        match self {
            Role::Input => "1;36",
            Role::Section => "90",
            Role::Reply => "1;32",
            Role::Strategy => "34",
            Role::Pattern => "36",
            Role::Count => "33",
            Role::Label => "2",
            Role::Miss => "31",
            Role::Hint => "33",
        }
    }
}

/// Renders report fragments, with or without ANSI escapes.
struct Styler {
    color: bool,
}

impl Styler {
    fn new(color: bool) -> Self {
        Self { color }
    }

    fn style(&self, role: Role, text: impl AsRef<str>) -> String {
        let text = text.as_ref();
        if self.color { format!("\x1b[{}m{text}\x1b[0m", role.sgr()) } else { text.to_string() }
    }

    fn section(&self, title: &str) -> String {
        self.style(Role::Section, format!("━━━ {title} ━━━"))
    }

    fn field(&self, label: &str, role: Role, value: impl AsRef<str>) -> String {
        format!("{} {}", self.style(Role::Label, format!("{label}:")), self.style(role, value))
    }
}

pub fn print_reply(input: &str, details: &ReplyDetails, color: bool) {
    let out = Styler::new(color);
    println!("\n{}", out.style(Role::Input, format!("⚙  Input: \"{input}\"")));

    println!("\n{}", out.section("Match"));
    print_match(details, &out);

    println!("\n{}", out.section("Template"));
    print_passes(details, &out);

    println!("\n{}", out.section("Reply"));
    println!("  {}", out.style(Role::Reply, &details.reply.text));

    println!("\n{}", out.section("Timing"));
    println!(
        "  {}  │  {}  │  {}",
        out.field("total", Role::Reply, format!("{:?}", details.reply.elapsed)),
        out.field("match", Role::Pattern, format!("{:?}", details.matching.duration)),
        out.field("template", Role::Label, format!("{:?}", details.template.total)),
    );
    println!();
}

pub fn print_miss(input: &str, err: &MatchError, color: bool) {
    let out = Styler::new(color);
    println!("\n{}", out.style(Role::Input, format!("⚙  Input: \"{input}\"")));
    println!("\n{}", out.section("Match"));
    println!("  {}", out.style(Role::Miss, format!("✗ {err}")));
    println!("\n{}", out.style(Role::Hint, "Possible reasons:"));
    println!("  • No pattern covers this input and no DEFAULT category exists");
    println!("  • A that/topic clause excluded every candidate");
    println!("\n{}", out.style(Role::Label, "  Tip: Set COLLOQUY_LOG=debug to see matcher decisions"));
    println!();
}

fn print_match(details: &ReplyDetails, out: &Styler) {
    let m = &details.matching;
    println!(
        "  {}  │ {}",
        out.field("strategy", Role::Strategy, m.strategy.as_str()),
        out.field("pattern", Role::Pattern, &details.pattern),
    );
    println!(
        "  {}  {}  {}",
        out.field("considered", Role::Count, m.considered.to_string()),
        out.field("gated", Role::Count, m.gated.to_string()),
        out.field("matched", Role::Count, m.matched.to_string()),
    );

    for (rank, candidate) in m.ranked.iter().take(5).enumerate() {
        println!(
            "    {} {} {} {}",
            out.style(Role::Section, format!("[{rank}]")),
            out.style(Role::Strategy, candidate.id.to_string()),
            out.style(Role::Pattern, &candidate.pattern),
            out.style(Role::Label, format!("score {}", candidate.score)),
        );
    }
    if m.ranked.len() > 5 {
        println!("    {}", out.style(Role::Label, format!("... +{} more", m.ranked.len() - 5)));
    }
}

fn print_passes(details: &ReplyDetails, out: &Styler) {
    let t = &details.template;
    if t.cache_hit {
        println!("  {}", out.style(Role::Reply, "✓ cache hit"));
        return;
    }
    if t.passes.is_empty() {
        println!("  {}", out.style(Role::Label, "No tags"));
        return;
    }
    for pass in &t.passes {
        println!(
            "  {}{} {}  {}",
            "  ".repeat(pass.depth),
            out.style(Role::Strategy, pass.handler),
            out.style(Role::Reply, format!("✓ {} tags", pass.processed)),
            out.style(Role::Label, format!("{:?}", pass.duration)),
        );
    }
}
