use nodeedge::field::{Bool, Link, MultiLink, Str, Uuid4};

pub struct Account;
pub struct Team;
pub struct Membership;

#[nodeedge::model("default::Account")]
impl Account {
    fn id() -> Uuid4;
    fn email() -> Str;
    #[default(true)]
    fn active() -> Bool;
    fn team() -> Option<Link<Team, Membership>>;
}

#[nodeedge::model(node)]
impl Team {
    fn name() -> Str;
    fn members() -> MultiLink<Account>;
    fn parent() -> Option<Link<Self>>;
}

#[nodeedge::model(link_property)]
impl Membership {
    fn role() -> Str;
}

fn main() {}
